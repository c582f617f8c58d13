//! Instrumented command for exercising the composites

use async_trait::async_trait;
use rigger_commands::{
    AsyncCommand, CommandError, CommandHandler, CommandId, CommandInfo, CommandResult, Result,
    SyncCommand, WorkflowRunId,
};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    max_active: AtomicUsize,
    runs: AtomicUsize,
}

/// Shared counters for a set of probes
#[derive(Debug, Clone, Default)]
pub(crate) struct ProbeStats {
    counters: Arc<Counters>,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> usize {
        self.counters.runs.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A command that records how many probes are running at once
pub(crate) struct Probe {
    id: CommandId,
    handler: Arc<CommandHandler>,
    stats: ProbeStats,
    delay: Duration,
    barrier: Option<Arc<Barrier>>,
    fail: bool,
}

impl Probe {
    pub fn new(handler: Arc<CommandHandler>, stats: ProbeStats, delay: Duration) -> Self {
        Self {
            id: CommandId::generate("probe"),
            handler,
            stats,
            delay,
            barrier: None,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Wait on `barrier` before finishing, so the probe only completes
    /// once every probe sharing the barrier is running
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    async fn work(
        stats: ProbeStats,
        delay: Duration,
        barrier: Option<Arc<Barrier>>,
        fail: bool,
    ) -> CommandResult {
        stats.enter();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        tokio::time::sleep(delay).await;
        stats.exit();

        if fail {
            CommandResult::failure("probe failed")
                .with_error(CommandError::ExecutionFailed("probe failed".to_string()))
        } else {
            CommandResult::success("probe done")
        }
    }
}

impl CommandInfo for Probe {
    fn id(&self) -> &CommandId {
        &self.id
    }

    fn name(&self) -> &str {
        "probe"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl SyncCommand for Probe {
    async fn run(&self, _run: &WorkflowRunId) -> Result<CommandResult> {
        Ok(Self::work(self.stats.clone(), self.delay, self.barrier.clone(), self.fail).await)
    }
}

impl AsyncCommand for Probe {
    fn start(&self, _run: &WorkflowRunId) -> Result<()> {
        let handler = self.handler.clone();
        let id = self.id.clone();
        let work = Self::work(self.stats.clone(), self.delay, self.barrier.clone(), self.fail);

        tokio::spawn(async move {
            let _ = handler.add_log_entry(&id, "probing");
            let mut result = work.await;
            let error = result.error.take();
            let _ = handler.finish_command(&id, result, error);
        });
        Ok(())
    }
}
