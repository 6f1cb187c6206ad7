// src/core/mod.rs
//! Configuration, database and file system plumbing shared by the server and the CLI

pub mod config_manager;
pub mod database;
pub mod fs_ops;

pub use config_manager::ConfigManager;
pub use database::Database;
pub use fs_ops::FsOps;
