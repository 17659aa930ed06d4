use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

// --- Request input ---

/// A claim or article submitted for fact-checking. `content` is rewritten in
/// place as it moves through normalization and summarization; callers that
/// need the original text copy it out first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimInput {
    #[serde(default)]
    pub url: Option<Url>,
    pub content: String,
}

// --- Labels ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FactCheckLabel {
    Correct,
    Incorrect,
    Misleading,
}

impl FactCheckLabel {
    /// Parse a label leniently, accepting the synonyms models tend to emit.
    pub fn from_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "correct" | "true" => Some(Self::Correct),
            "incorrect" | "false" => Some(Self::Incorrect),
            "misleading" | "partially true" | "partially false" | "mixed" | "unproven" => {
                Some(Self::Misleading)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for FactCheckLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Incorrect => write!(f, "incorrect"),
            Self::Misleading => write!(f, "misleading"),
        }
    }
}

// --- Persisted fact-check result ---

/// One completed fact-check, cached by content fingerprint.
/// `archive` is set iff the label is not `Correct` and a source URL exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckRecord {
    pub url: Option<Url>,
    pub label: FactCheckLabel,
    pub summary: String,
    pub response: String,
    pub is_safe: bool,
    pub archive: Option<String>,
    pub references: Vec<Url>,
    pub updated_at: DateTime<Utc>,
}

// --- Fallacy / bias analysis ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReasoningReport {
    pub fallacies: Vec<String>,
    pub bias_indicators: Vec<String>,
    pub explanation: String,
}

// --- Task tracking ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Summarizing,
    FactChecking,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Summarizing => "summarizing",
            Self::FactChecking => "fact_checking",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One fact-check request tracked through the stage sequence. Owns a frozen
/// copy of the submitted input; on completion the result is embedded by value
/// together with pre/post-summarization provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub message: String,
    pub input_data: ClaimInput,
    pub result: Option<FactCheckRecord>,
    pub original_content: Option<String>,
    pub summarized_content: Option<String>,
    pub fallacy: Option<ReasoningReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(input: ClaimInput) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            status: TaskStatus::Pending,
            message: "Task created".to_string(),
            input_data: input,
            result: None,
            original_content: None,
            summarized_content: None,
            fallacy: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Cache fingerprint ---

/// Cache key for a fact-check: sha256 over the normalized original content
/// and the source URL. Keyed on pre-summarization text so summarizer
/// non-determinism cannot cause cache misses.
pub fn fingerprint(content: &str, url: Option<&Url>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    if let Some(url) = url {
        hasher.update(b"\n");
        hasher.update(url.as_str().as_bytes());
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_labels_map_synonyms() {
        assert_eq!(
            FactCheckLabel::from_lenient("TRUE"),
            Some(FactCheckLabel::Correct)
        );
        assert_eq!(
            FactCheckLabel::from_lenient("false"),
            Some(FactCheckLabel::Incorrect)
        );
        assert_eq!(
            FactCheckLabel::from_lenient("Partially True"),
            Some(FactCheckLabel::Misleading)
        );
        assert_eq!(
            FactCheckLabel::from_lenient(" unproven "),
            Some(FactCheckLabel::Misleading)
        );
        assert_eq!(FactCheckLabel::from_lenient("unknowable"), None);
    }

    #[test]
    fn label_serializes_lowercase() {
        let json = serde_json::to_string(&FactCheckLabel::Misleading).unwrap();
        assert_eq!(json, "\"misleading\"");
    }

    #[test]
    fn fingerprint_is_stable_and_url_sensitive() {
        let url: Url = "https://example.com/a".parse().unwrap();
        let a = fingerprint("claim text", Some(&url));
        let b = fingerprint("claim text", Some(&url));
        let c = fingerprint("claim text", None);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn new_task_is_pending() {
        let task = TaskRecord::new(ClaimInput {
            url: None,
            content: "x".to_string(),
        });
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(!task.status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::FactChecking.is_terminal());
    }
}
