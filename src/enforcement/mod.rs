pub mod evaluator;
pub mod issue_actions;
pub mod labels;
pub mod reevaluation;
pub mod status_checks;

pub use evaluator::{CommitBuckets, EvaluationOutcome, PullRequestEvaluator};
pub use reevaluation::ReevaluationTrigger;
