//! Core data model: Severity, Issue, Review, RoleSpec/Participant,
//! DocumentVersion, IterationRecord, Session, ConvergenceReport.

mod document;
mod iteration;
mod participant;
mod report;
mod review;
mod session;
mod severity;

pub use document::DocumentVersion;
pub use iteration::IterationRecord;
pub use participant::{Participant, RoleSpec};
pub use report::{ConvergenceReport, IterationSummary, StoppedBy};
pub use review::{Issue, Review, TokenCounts};
pub use session::{Session, SessionId, SessionStatus};
pub use severity::{count_severities, Severity, SeverityCounts};
