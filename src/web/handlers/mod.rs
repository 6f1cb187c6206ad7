pub mod outreach_handlers;
pub mod scan_handlers;
pub mod system_handlers;

pub use outreach_handlers::*;
pub use scan_handlers::*;
pub use system_handlers::*;
