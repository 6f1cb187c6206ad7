pub mod outreach;
pub mod scan;

pub use outreach::{MessageType, NewOutreach, OutreachMessage};
pub use scan::{
    AnalysisSource, GhostLikelihoodLevel, JobAnalysis, NewScan, RedFlag, ScanRecord, Severity,
};
