//! Task state machine: drives one fact-check request through the stage
//! sequence and persists every transition.
//!
//! Happy path: Pending → Processing → Summarizing → FactChecking →
//! Completed. Any unrecovered error forces Failed with the error message.
//! The status log is append-only from the caller's view; there is no cancel
//! or resume.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use claimlens_common::{ClaimInput, ClaimLensError, FactCheckRecord, TaskRecord, TaskStatus};

use crate::checker::FactChecker;
use crate::claim_detect;
use crate::fallacy;
use crate::model::LanguageModel;
use crate::store::{CheckStore, TaskCompletion};

/// What a status query exposes to callers.
#[derive(Debug, Clone)]
pub struct TaskStatusView {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub message: String,
    pub result: Option<FactCheckRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct TaskRunner {
    store: Arc<dyn CheckStore>,
    checker: Arc<FactChecker>,
    detect_model: Arc<dyn LanguageModel>,
    analysis_model: Arc<dyn LanguageModel>,
    fallacy_analysis: bool,
}

impl TaskRunner {
    pub fn new(
        store: Arc<dyn CheckStore>,
        checker: Arc<FactChecker>,
        detect_model: Arc<dyn LanguageModel>,
        analysis_model: Arc<dyn LanguageModel>,
        fallacy_analysis: bool,
    ) -> Self {
        Self {
            store,
            checker,
            detect_model,
            analysis_model,
            fallacy_analysis,
        }
    }

    /// Create a Pending task and spawn its pipeline. Returns the freshly
    /// created record; processing continues in the background.
    pub async fn submit(self: &Arc<Self>, input: ClaimInput) -> Result<TaskRecord, ClaimLensError> {
        let task = TaskRecord::new(input.clone());
        self.store.create_task(&task).await?;

        let runner = Arc::clone(self);
        let task_id = task.task_id;
        tokio::spawn(async move {
            runner.run(task_id, input).await;
        });

        info!(%task_id, "task submitted");
        Ok(task)
    }

    /// Current status of a task. Malformed or unknown identifiers answer
    /// `None`; only a store failure is an error.
    pub async fn status(&self, task_id: &str) -> Result<Option<TaskStatusView>, ClaimLensError> {
        let Ok(id) = Uuid::parse_str(task_id) else {
            return Ok(None);
        };

        let task = self.store.task(id).await?;
        Ok(task.map(|t| TaskStatusView {
            task_id: t.task_id,
            status: t.status,
            message: t.message,
            result: t.result,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }))
    }

    async fn run(&self, task_id: Uuid, input: ClaimInput) {
        if let Err(e) = self.process(task_id, input).await {
            warn!(%task_id, error = %e, "task failed");
            let message = format!("Task failed: {e}");
            if let Err(persist) = self
                .store
                .set_task_status(task_id, TaskStatus::Failed, &message)
                .await
            {
                error!(%task_id, error = %persist, "failed to record task failure");
            }
        }
    }

    async fn process(&self, task_id: Uuid, mut input: ClaimInput) -> Result<(), ClaimLensError> {
        let original_content = input.content.clone();

        self.store
            .set_task_status(task_id, TaskStatus::Processing, "Task started processing")
            .await?;

        let detection = claim_detect::detect(self.detect_model.as_ref(), &original_content).await;
        info!(
            %task_id,
            is_claim = detection.is_factual_claim,
            confidence = detection.confidence,
            "claim detection finished"
        );

        let summarizing_message = if detection.is_factual_claim {
            "Summarizing content".to_string()
        } else {
            "Summarizing content (input may not be a verifiable claim)".to_string()
        };
        self.store
            .set_task_status(task_id, TaskStatus::Summarizing, &summarizing_message)
            .await?;

        let key = self.checker.prepare(&mut input).await?;

        self.store
            .set_task_status(
                task_id,
                TaskStatus::FactChecking,
                "Performing fact check analysis",
            )
            .await?;

        let fallacy = if self.fallacy_analysis {
            fallacy::analyze(self.analysis_model.as_ref(), &original_content).await
        } else {
            None
        };

        let (record, cached) = self.checker.check(&input, &key).await?;
        if !cached {
            self.store.put_fact(&key, &record).await;
        }

        self.store
            .complete_task(
                task_id,
                &TaskCompletion {
                    message: "Fact check completed successfully".to_string(),
                    result: record,
                    original_content,
                    summarized_content: input.content.clone(),
                    fallacy,
                },
            )
            .await?;

        info!(%task_id, cached, "task completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClaimClassifier;
    use crate::evidence::{EvidenceRetriever, DEFAULT_FETCH_CONCURRENCY};
    use crate::summarize::Summarizer;
    use crate::testing::{
        MemoryStore, MockArchiver, MockModel, MockPageFetcher, MockSearcher, MockTranslator,
    };
    use claimlens_common::FactCheckLabel;

    fn runner(store: Arc<MemoryStore>, translator: MockTranslator) -> Arc<TaskRunner> {
        let verdict = r#"{"label":"incorrect","explanation":"Debunked.","sources":[]}"#;
        let retriever = EvidenceRetriever::new(
            Arc::new(MockSearcher::returning(Vec::new())),
            Arc::new(MockPageFetcher::new()),
            Summarizer::new(Arc::new(MockModel::failing())),
            DEFAULT_FETCH_CONCURRENCY,
        );
        let classifier = ClaimClassifier::new(
            Arc::new(MockModel::always(r#"{"query":"q"}"#)),
            Arc::new(MockModel::always(verdict)),
            retriever,
            3,
        );
        let checker = FactChecker::new(
            Arc::new(translator),
            Summarizer::new(Arc::new(MockModel::failing())),
            classifier,
            Arc::new(MockArchiver::new()),
            store.clone(),
        );
        Arc::new(TaskRunner::new(
            store,
            Arc::new(checker),
            Arc::new(MockModel::failing()),
            Arc::new(MockModel::always(
                r#"{"fallacies":[],"bias_indicators":[],"explanation":"Nothing found."}"#,
            )),
            true,
        ))
    }

    async fn wait_for_terminal(store: &MemoryStore, task_id: Uuid) -> TaskRecord {
        for _ in 0..100 {
            if let Some(task) = store.task(task_id).await.unwrap() {
                if task.status.is_terminal() {
                    return task;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("task never reached a terminal state");
    }

    #[tokio::test]
    async fn submitted_task_starts_pending_and_completes() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store.clone(), MockTranslator::not_found());

        let task = runner
            .submit(ClaimInput {
                url: None,
                content: "The moon is made of cheese.".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let done = wait_for_terminal(&store, task.task_id).await;
        assert_eq!(done.status, TaskStatus::Completed);
        let result = done.result.expect("completed task must carry a result");
        assert_eq!(result.label, FactCheckLabel::Incorrect);
        assert_eq!(
            done.original_content.as_deref(),
            Some("The moon is made of cheese.")
        );
        assert!(done.fallacy.is_some());
    }

    #[tokio::test]
    async fn stage_failure_marks_task_failed_without_result() {
        let store = Arc::new(MemoryStore::new());
        // A hard translator failure has no fallback and aborts the task.
        let runner = runner(store.clone(), MockTranslator::failing("upstream down"));

        let task = runner
            .submit(ClaimInput {
                url: None,
                content: "Un texte à vérifier qui ne passera pas.".to_string(),
            })
            .await
            .unwrap();

        let done = wait_for_terminal(&store, task.task_id).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.result.is_none());
        assert!(done.message.contains("Task failed"));
    }

    #[tokio::test]
    async fn status_of_malformed_id_is_none() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store, MockTranslator::not_found());
        let view = runner.status("not-a-uuid").await.unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn status_of_unknown_id_is_none() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store, MockTranslator::not_found());
        let view = runner
            .status("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn status_transitions_are_recorded() {
        let store = Arc::new(MemoryStore::new());
        let runner = runner(store.clone(), MockTranslator::not_found());

        let task = runner
            .submit(ClaimInput {
                url: None,
                content: "Water boils at 100 degrees Celsius at sea level.".to_string(),
            })
            .await
            .unwrap();

        wait_for_terminal(&store, task.task_id).await;
        let seen = store.status_history(task.task_id);
        assert_eq!(seen.first(), Some(&TaskStatus::Pending));
        assert_eq!(seen.last(), Some(&TaskStatus::Completed));
        // The intermediate stages appear in order.
        let processing = seen.iter().position(|s| *s == TaskStatus::Processing);
        let summarizing = seen.iter().position(|s| *s == TaskStatus::Summarizing);
        let checking = seen.iter().position(|s| *s == TaskStatus::FactChecking);
        assert!(processing < summarizing && summarizing < checking);
    }
}
