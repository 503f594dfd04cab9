//! External evidence collection collaborators.
//!
//! Each source sits behind a narrow trait so the lifecycle engine can treat
//! collection failures as degraded input and tests can substitute fakes.
pub mod breach;
pub mod mentions;
pub mod scanner;

use anyhow::Result;

use crate::pipeline::{Finding, RawEvent};

pub use breach::{breach_finding, BreachApiClient, BreachRecord};
pub use mentions::{mention_finding, FileMentionSearch};
pub use scanner::ScannerCli;

/// Raw event collection from the scanning tool.
pub trait EvidenceCollector {
    fn collect(&self, target: &str) -> Result<Vec<RawEvent>>;
}

/// Breach-directory lookup for an email address.
pub trait BreachDirectory {
    fn breaches_for(&self, email: &str) -> Result<Vec<BreachRecord>>;
}

/// Public web-mention search for a query.
pub trait MentionSearch {
    fn mentions(&self, query: &str) -> Result<Vec<Finding>>;
}
