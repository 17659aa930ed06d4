//! Fact-check orchestration pipeline.
//!
//! Stage order per task: normalize → translate → summarize → (claim
//! detection, fallacy analysis) → classify (drives evidence retrieval) →
//! persist → terminal state. Every external call is a suspension point;
//! component-local fallbacks keep single failures from aborting a task.

pub mod archive;
pub mod checker;
pub mod claim_detect;
pub mod classify;
pub mod evidence;
pub mod fallacy;
pub mod model;
pub mod normalize;
pub mod store;
pub mod summarize;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod translate;

pub use checker::FactChecker;
pub use classify::{ClaimClassifier, ClassificationResult};
pub use evidence::{EvidenceRecord, EvidenceRetriever};
pub use summarize::{Summarizer, SummaryMode};
pub use task::{TaskRunner, TaskStatusView};
