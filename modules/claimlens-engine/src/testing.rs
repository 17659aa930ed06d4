//! Deterministic in-memory doubles for the pipeline seams.
//!
//! `MockModel` scripts structured-output replies, `MockTranslator`,
//! `MockSearcher`, `MockPageFetcher`, and `MockArchiver` stand in for the
//! network services, and `MemoryStore` is a HashMap-backed [`CheckStore`]
//! that also records the status history each task went through.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use claimlens_common::{ClaimLensError, FactCheckRecord, TaskRecord, TaskStatus};

use crate::archive::Archiver;
use crate::evidence::{PageFetcher, SearchItem, WebSearcher};
use crate::model::LanguageModel;
use crate::store::{CheckStore, TaskCompletion};
use crate::translate::{TranslateError, Translator};

// --- MockModel ---

enum ModelScript {
    /// Same reply on every call.
    Always(String),
    /// One scripted outcome per call, then errors.
    Sequence(Mutex<Vec<Result<String, String>>>),
    Failing,
}

pub struct MockModel {
    script: ModelScript,
    calls: Arc<AtomicUsize>,
}

impl MockModel {
    pub fn always(reply: &str) -> Self {
        Self {
            script: ModelScript::Always(reply.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn sequence(replies: Vec<Result<String>>) -> Self {
        let mut scripted: Vec<Result<String, String>> = replies
            .into_iter()
            .map(|r| r.map_err(|e| e.to_string()))
            .collect();
        // Stored reversed so each call pops the next outcome.
        scripted.reverse();
        Self {
            script: ModelScript::Sequence(Mutex::new(scripted)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: ModelScript::Failing,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, for asserting after the mock has been moved.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn structured(
        &self,
        _system: &str,
        _user: &str,
        _schema: serde_json::Value,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            ModelScript::Always(reply) => Ok(reply.clone()),
            ModelScript::Sequence(remaining) => {
                let next = remaining
                    .lock()
                    .map_err(|_| anyhow!("mock model lock poisoned"))?
                    .pop();
                match next {
                    Some(Ok(reply)) => Ok(reply),
                    Some(Err(e)) => Err(anyhow!(e)),
                    None => Err(anyhow!("mock model script exhausted")),
                }
            }
            ModelScript::Failing => Err(anyhow!("mock model failure")),
        }
    }
}

// --- MockTranslator ---

enum TranslatorScript {
    Returning(String),
    NotFound,
    Failing(String),
}

pub struct MockTranslator {
    script: TranslatorScript,
}

impl MockTranslator {
    pub fn returning(text: &str) -> Self {
        Self {
            script: TranslatorScript::Returning(text.to_string()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            script: TranslatorScript::NotFound,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            script: TranslatorScript::Failing(reason.to_string()),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn to_english(&self, _text: &str) -> Result<String, TranslateError> {
        match &self.script {
            TranslatorScript::Returning(text) => Ok(text.clone()),
            TranslatorScript::NotFound => Err(TranslateError::NotFound),
            TranslatorScript::Failing(reason) => Err(TranslateError::Failed(reason.clone())),
        }
    }
}

// --- MockSearcher ---

pub struct MockSearcher {
    results: Option<Vec<SearchItem>>,
}

impl MockSearcher {
    pub fn returning(results: Vec<SearchItem>) -> Self {
        Self {
            results: Some(results),
        }
    }

    pub fn failing() -> Self {
        Self { results: None }
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, _query: &str, num_results: usize) -> Result<Vec<SearchItem>> {
        match &self.results {
            Some(results) => Ok(results.iter().take(num_results).cloned().collect()),
            None => Err(anyhow!("mock search failure")),
        }
    }
}

// --- MockPageFetcher ---

/// Registered URLs answer their text; anything else fails the fetch.
pub struct MockPageFetcher {
    pages: HashMap<String, String>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn on_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no page registered for {url}"))
    }
}

// --- MockArchiver ---

pub struct MockArchiver {
    snapshots: Mutex<Vec<String>>,
}

impl MockArchiver {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub fn archived(&self) -> Vec<String> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockArchiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archiver for MockArchiver {
    async fn archive(&self, url: &str) -> Result<String> {
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.push(url.to_string());
        }
        Ok(format!("https://archive.example/snapshot/{url}"))
    }
}

// --- MemoryStore ---

#[derive(Default)]
struct MemoryState {
    facts: HashMap<String, FactCheckRecord>,
    tasks: HashMap<Uuid, TaskRecord>,
    history: HashMap<Uuid, Vec<TaskStatus>>,
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Every status a task has passed through, in write order.
    pub fn status_history(&self, task_id: Uuid) -> Vec<TaskStatus> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.history.get(&task_id).cloned())
            .unwrap_or_default()
    }

    pub fn fact_count(&self) -> usize {
        self.state.lock().map(|s| s.facts.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckStore for MemoryStore {
    async fn cached_fact(&self, fingerprint: &str) -> Option<FactCheckRecord> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.facts.get(fingerprint).cloned())
    }

    async fn put_fact(&self, fingerprint: &str, record: &FactCheckRecord) {
        if let Ok(mut state) = self.state.lock() {
            state.facts.insert(fingerprint.to_string(), record.clone());
        }
    }

    async fn create_task(&self, task: &TaskRecord) -> Result<(), ClaimLensError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ClaimLensError::Database("memory store lock poisoned".to_string()))?;
        state.tasks.insert(task.task_id, task.clone());
        state
            .history
            .entry(task.task_id)
            .or_default()
            .push(task.status);
        Ok(())
    }

    async fn set_task_status(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        message: &str,
    ) -> Result<(), ClaimLensError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ClaimLensError::Database("memory store lock poisoned".to_string()))?;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| ClaimLensError::Database(format!("unknown task {task_id}")))?;
        task.status = status;
        task.message = message.to_string();
        task.updated_at = chrono::Utc::now();
        state.history.entry(task_id).or_default().push(status);
        Ok(())
    }

    async fn complete_task(
        &self,
        task_id: Uuid,
        completion: &TaskCompletion,
    ) -> Result<(), ClaimLensError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ClaimLensError::Database("memory store lock poisoned".to_string()))?;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| ClaimLensError::Database(format!("unknown task {task_id}")))?;
        task.status = TaskStatus::Completed;
        task.message = completion.message.clone();
        task.result = Some(completion.result.clone());
        task.original_content = Some(completion.original_content.clone());
        task.summarized_content = Some(completion.summarized_content.clone());
        task.fallacy = completion.fallacy.clone();
        task.updated_at = chrono::Utc::now();
        state
            .history
            .entry(task_id)
            .or_default()
            .push(TaskStatus::Completed);
        Ok(())
    }

    async fn task(&self, task_id: Uuid) -> Result<Option<TaskRecord>, ClaimLensError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ClaimLensError::Database("memory store lock poisoned".to_string()))?;
        Ok(state.tasks.get(&task_id).cloned())
    }
}
