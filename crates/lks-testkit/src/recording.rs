//! Handler that records what the engine delivered to it.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};

use lks_sync::{HandlerScope, LockEvent, LockHandler, LockInstance, LogMeta};

/// Edit applied to a working copy from inside a callback.
pub type Reaction = Arc<dyn Fn(&mut LockInstance) + Send + Sync>;

/// Records one line per callback:
///
/// - `enter:<n locks>` / `exit:<n locks>`
/// - `start:<lock>` / `complete:<lock>`
/// - `event:<lock>:<log id>:<log type>`
/// - `update:<n instances>`
pub struct RecordingHandler {
    name: String,
    calls: Mutex<Vec<String>>,
    fail_on: Option<String>,
    on_event: Option<Reaction>,
    on_complete: Option<Reaction>,
    on_update: Option<Reaction>,
}

impl RecordingHandler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            on_event: None,
            on_complete: None,
            on_update: None,
        }
    }

    /// Return `Err` from the callback for this log id.
    pub fn failing_on(mut self, log_id: &str) -> Self {
        self.fail_on = Some(log_id.to_string());
        self
    }

    pub fn reacting_to_events(mut self, f: impl Fn(&mut LockInstance) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(f));
        self
    }

    pub fn reacting_on_complete(
        mut self,
        f: impl Fn(&mut LockInstance) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn reacting_on_update(mut self, f: impl Fn(&mut LockInstance) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(f));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Recorded `event:` lines only, as `<lock>:<log id>`.
    pub fn events(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("event:").map(str::to_string))
            .map(|c| c.rsplit_once(':').map(|(head, _)| head.to_string()).unwrap_or(c))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut c) = self.calls.lock() {
            c.clear();
        }
    }

    fn record(&self, line: String) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("recording handler mutex poisoned"))?
            .push(line);
        Ok(())
    }
}

#[async_trait::async_trait]
impl LockHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_handler_enter(&self, scope: &HandlerScope) -> Result<()> {
        self.record(format!("enter:{}", scope.locks.len()))
    }

    async fn on_handler_exit(&self, scope: &HandlerScope) -> Result<()> {
        self.record(format!("exit:{}", scope.locks.len()))
    }

    async fn on_processing_started(&self, instance: &mut LockInstance) -> Result<()> {
        self.record(format!("start:{}", instance.lock_id()))
    }

    async fn on_processing_completed(&self, instance: &mut LockInstance) -> Result<()> {
        if let Some(f) = &self.on_complete {
            f(instance);
        }
        self.record(format!("complete:{}", instance.lock_id()))
    }

    async fn on_handler_update(&self, instances: &mut [LockInstance]) -> Result<()> {
        if let Some(f) = &self.on_update {
            for instance in instances.iter_mut() {
                f(instance);
            }
        }
        self.record(format!("update:{}", instances.len()))
    }

    async fn on_event(
        &self,
        instance: &mut LockInstance,
        meta: &LogMeta,
        _event: &LockEvent,
    ) -> Result<()> {
        if self.fail_on.as_deref() == Some(meta.id.as_str()) {
            bail!("handler {} refused log {}", self.name, meta.id);
        }
        if let Some(f) = &self.on_event {
            f(instance);
        }
        self.record(format!(
            "event:{}:{}:{}",
            meta.lock_id,
            meta.id,
            meta.log_type.as_str()
        ))
    }
}
