//! Reviewer, moderator and meta-planner capability traits.

mod moderator;
mod planner;
mod reviewer;

pub use moderator::{ModeratorAgent, ModeratorOutput};
pub use planner::{builtin_preset, generic_template, MetaPlanner, PlanOutput, DEFAULT_MODERATOR_FOCUS};
pub use reviewer::{parse_review_response, parse_with_one_salvage, RawIssue, RawReview, ReviewerAgent};
