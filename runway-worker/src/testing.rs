//! In-memory fakes of the worker's capability interfaces

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use runway_core::domain::run::{QueueMessage, RunStatus};
use runway_core::domain::variable::Variable;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::archive::{ArchiveExtractor, ExtractError};
use crate::config::Config;
use crate::process::{Invocation, ProcessError, ProcessExecutor, ProcessOutput};
use crate::repository::{BundleStore, BundleStream, RunQueue, RunStatusRepository, VariableRepository};

/// Configuration rooted in a scratch directory, with an installed engine binary
pub fn test_config(scratch: &Path) -> Config {
    let binary = scratch.join(".bin").join("terraform");
    std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
    std::fs::write(&binary, "").unwrap();

    let mut config = Config::new("worker-test".to_string(), "http://localhost:8080".to_string());
    config.work_dir = scratch.join("tf-config");
    config.download_dir = scratch.to_path_buf();
    config.engine_binary = binary;
    config.engine_cache_dir = None;
    config
}

pub fn run_request_body(config_version_id: &str, bundle_key: &str, workspace_id: &str) -> String {
    serde_json::json!({
        "configVersionId": config_version_id,
        "configVersionS3ObjectKey": bundle_key,
        "workspaceId": workspace_id,
    })
    .to_string()
}

pub fn queue_message(id: &str, body: &str) -> QueueMessage {
    QueueMessage {
        message_id: id.to_string(),
        body: body.to_string(),
        receipt_handle: format!("receipt-{}", id),
    }
}

pub fn message(body: &str) -> QueueMessage {
    queue_message("msg-1", body)
}

#[derive(Clone)]
enum Behavior {
    Output(ProcessOutput),
    SpawnFailure,
    Hang,
}

/// Scripted process executor
///
/// Invocations whose command line contains a registered pattern get that
/// pattern's behavior; the latest registration wins. Anything else exits 0
/// with empty output.
#[derive(Default)]
pub struct FakeExecutor {
    behaviors: Mutex<Vec<(String, Behavior)>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, pattern: &str, output: ProcessOutput) {
        self.register(pattern, Behavior::Output(output));
    }

    pub fn fail_spawn(&self, pattern: &str) {
        self.register(pattern, Behavior::SpawnFailure);
    }

    /// Matching invocations never complete
    pub fn hang(&self, pattern: &str) {
        self.register(pattern, Behavior::Hang);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn register(&self, pattern: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .push((pattern.to_string(), behavior));
    }

    fn behavior_for(&self, invocation: &Invocation) -> Option<Behavior> {
        let command_line = invocation.command_line();
        self.behaviors
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(pattern, _)| command_line.contains(pattern.as_str()))
            .map(|(_, behavior)| behavior.clone())
    }
}

#[async_trait]
impl ProcessExecutor for FakeExecutor {
    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, ProcessError> {
        let behavior = self.behavior_for(&invocation);
        let program = invocation.program.clone();
        self.invocations.lock().unwrap().push(invocation);

        match behavior {
            None => Ok(ProcessOutput::default()),
            Some(Behavior::Output(output)) => Ok(output),
            Some(Behavior::SpawnFailure) => Err(ProcessError::Spawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }),
            Some(Behavior::Hang) => std::future::pending().await,
        }
    }
}

/// Extractor that writes a `main.tf` into the destination
#[derive(Default)]
pub struct FakeExtractor {
    failing: AtomicBool,
    extractions: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// (archive, destination) pairs
    pub fn extractions(&self) -> Vec<(PathBuf, PathBuf)> {
        self.extractions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveExtractor for FakeExtractor {
    async fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        _strip_components: u32,
    ) -> Result<(), ExtractError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExtractError::Failed {
                exit_code: 2,
                stderr: "not in gzip format".to_string(),
            });
        }

        self.extractions
            .lock()
            .unwrap()
            .push((archive.to_path_buf(), dest.to_path_buf()));
        std::fs::write(dest.join("main.tf"), "terraform {}").unwrap();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBundleStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl FakeBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleStore for FakeBundleStore {
    async fn fetch(&self, key: &str) -> Result<BundleStream> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("object {} not found", key))?;
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }
}

#[derive(Default)]
pub struct FakeVariables {
    failing: bool,
    variables: Mutex<Vec<Variable>>,
}

impl FakeVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, variable: Variable) {
        self.variables.lock().unwrap().push(variable);
    }
}

#[async_trait]
impl VariableRepository for FakeVariables {
    async fn list_variables(&self, workspace_id: &str) -> Result<Vec<Variable>> {
        if self.failing {
            return Err(anyhow!("variable store unavailable"));
        }
        Ok(self
            .variables
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.workspace_id == workspace_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeStatus {
    failing: AtomicBool,
    reports: Mutex<Vec<(String, RunStatus)>>,
}

impl FakeStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn reports(&self) -> Vec<(String, RunStatus)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunStatusRepository for FakeStatus {
    async fn report(
        &self,
        config_version_id: &str,
        status: RunStatus,
        _message: Option<String>,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("control plane unavailable"));
        }
        self.reports
            .lock()
            .unwrap()
            .push((config_version_id.to_string(), status));
        Ok(())
    }
}

/// Queue serving scripted receive results, then empty batches
#[derive(Default)]
pub struct FakeQueue {
    batches: Mutex<VecDeque<Result<Vec<QueueMessage>, String>>>,
    receives: AtomicUsize,
    acknowledged: Mutex<Vec<String>>,
}

impl FakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, messages: Vec<QueueMessage>) {
        self.batches.lock().unwrap().push_back(Ok(messages));
    }

    pub fn push_error(&self, error: &str) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(error.to_string()));
    }

    pub fn receive_count(&self) -> usize {
        self.receives.load(Ordering::SeqCst)
    }

    /// Receipt handles acknowledged so far
    pub fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunQueue for FakeQueue {
    async fn receive(&self, max_messages: u32, _wait_time: Duration) -> Result<Vec<QueueMessage>> {
        self.receives.fetch_add(1, Ordering::SeqCst);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(Ok(mut messages)) => {
                messages.truncate(max_messages as usize);
                Ok(messages)
            }
            Some(Err(e)) => Err(anyhow!(e)),
            None => {
                // A short long-poll, so polling loops yield to other tasks
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn acknowledge(&self, receipt_handle: &str) -> Result<()> {
        self.acknowledged
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        Ok(())
    }
}
