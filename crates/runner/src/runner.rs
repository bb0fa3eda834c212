//! The script scheduling loop.
//!
//! A single long-lived background task drives repeated script execution:
//! on every tick it starts one cycle, executing each configured script in
//! its own task. Faulty or hanging scripts never abort the cycle, the
//! loop, or the process. Shutdown lets the current cycle drain before the
//! loop quiesces.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use vigil_alert::Engine;
use vigil_core::{Datasource, Script};

use crate::sandbox::{Sandbox, ScriptContext};

/// Errors from runner lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("runner already started")]
    AlreadyStarted,

    #[error("tick interval must be > 0")]
    InvalidInterval,
}

/// Lifecycle of the scheduling loop.
///
/// `Idle → Running → Stopping → Stopped`; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Drives the configured scripts on a fixed tick interval.
///
/// `stop()` is idempotent and may race with an external cancellation
/// signal; both converge on `Stopped`. `wait()` blocks until the loop has
/// fully quiesced — in-flight script executions are allowed to finish,
/// never killed.
pub struct Runner {
    scripts: Vec<Arc<Script>>,
    sandbox: Arc<dyn Sandbox>,
    engine: Arc<Engine>,
    datasources: HashMap<String, Arc<dyn Datasource>>,
    interval: Duration,
    state_tx: watch::Sender<RunnerState>,
    state_rx: watch::Receiver<RunnerState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    // Serializes start/stop state decisions.
    lifecycle: Mutex<()>,
}

impl Runner {
    pub fn new(
        scripts: Vec<Script>,
        sandbox: Arc<dyn Sandbox>,
        engine: Arc<Engine>,
        interval: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(RunnerState::Idle);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            scripts: scripts.into_iter().map(Arc::new).collect(),
            sandbox,
            engine,
            datasources: HashMap::new(),
            interval,
            state_tx,
            state_rx,
            shutdown_tx,
            shutdown_rx,
            lifecycle: Mutex::new(()),
        }
    }

    /// Attach named datasources exposed to script executions.
    pub fn with_datasources(mut self, datasources: HashMap<String, Arc<dyn Datasource>>) -> Self {
        self.datasources = datasources;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        *self.state_rx.borrow()
    }

    /// Spawn the scheduling loop. The first cycle starts immediately.
    pub fn start(&self) -> Result<(), RunnerError> {
        if self.interval.is_zero() {
            return Err(RunnerError::InvalidInterval);
        }

        let _guard = self.lifecycle.lock().unwrap();
        if *self.state_rx.borrow() != RunnerState::Idle {
            return Err(RunnerError::AlreadyStarted);
        }
        let _ = self.state_tx.send(RunnerState::Running);

        let scripts = self.scripts.clone();
        let sandbox = self.sandbox.clone();
        let engine = self.engine.clone();
        let datasources = self.datasources.clone();
        let interval = self.interval;
        let state_tx = self.state_tx.clone();
        let shutdown_rx = self.shutdown_rx.clone();

        info!(scripts = scripts.len(), interval = ?interval, "scheduler starting");
        tokio::spawn(run_loop(
            scripts,
            sandbox,
            engine,
            datasources,
            interval,
            state_tx,
            shutdown_rx,
        ));

        Ok(())
    }

    /// Request shutdown. Idempotent; safe to call from a signal handler
    /// path concurrently with any other caller.
    pub fn stop(&self) {
        let _guard = self.lifecycle.lock().unwrap();
        // Copy the state out so the watch read borrow is released before
        // `state_tx.send` takes the same channel's write lock below.
        let state = *self.state_rx.borrow();
        match state {
            RunnerState::Idle => {
                // Never started; nothing to drain.
                let _ = self.state_tx.send(RunnerState::Stopped);
            }
            RunnerState::Running | RunnerState::Stopping => {
                let _ = self.shutdown_tx.send_replace(true);
            }
            RunnerState::Stopped => {}
        }
    }

    /// Block until the loop has reached `Stopped`.
    pub async fn wait(&self) {
        let mut rx = self.state_rx.clone();
        loop {
            if *rx.borrow_and_update() == RunnerState::Stopped {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// The long-lived loop task: tick → cycle, reap finished executions,
/// observe shutdown.
async fn run_loop(
    scripts: Vec<Arc<Script>>,
    sandbox: Arc<dyn Sandbox>,
    engine: Arc<Engine>,
    datasources: HashMap<String, Arc<dyn Datasource>>,
    interval: Duration,
    state_tx: watch::Sender<RunnerState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut tasks: JoinSet<String> = JoinSet::new();
    // Re-entrancy guard: script names with an execution still in flight.
    let mut in_flight: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for script in &scripts {
                    if script.ignore {
                        continue;
                    }
                    if in_flight.contains(&script.name) {
                        warn!(script = %script.name, "previous execution still in flight, skipping this cycle");
                        continue;
                    }
                    in_flight.insert(script.name.clone());
                    tasks.spawn(execute_script(
                        script.clone(),
                        sandbox.clone(),
                        engine.clone(),
                        datasources.clone(),
                    ));
                }
            }
            Some(done) = tasks.join_next(), if !tasks.is_empty() => {
                if let Ok(name) = done {
                    in_flight.remove(&name);
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = state_tx.send(RunnerState::Stopping);
                break;
            }
        }
    }

    // No new cycles start; let the current one finish naturally.
    info!(pending = tasks.len(), "scheduler stopping, draining in-flight executions");
    while tasks.join_next().await.is_some() {}

    let _ = state_tx.send(RunnerState::Stopped);
    info!("scheduler stopped");
}

/// One script execution, isolated so that neither errors nor panics reach
/// the loop. Always returns the script name for the in-flight guard.
async fn execute_script(
    script: Arc<Script>,
    sandbox: Arc<dyn Sandbox>,
    engine: Arc<Engine>,
    datasources: HashMap<String, Arc<dyn Datasource>>,
) -> String {
    let name = script.name.clone();
    let ctx = ScriptContext {
        alerts: engine.bind(script.clone()),
        datasources,
    };

    let handle = tokio::spawn(async move { sandbox.execute(&script, ctx).await });
    match handle.await {
        Ok(Ok(())) => debug!(script = %name, "script completed"),
        Ok(Err(e)) => warn!(script = %name, error = %e, "script execution failed"),
        Err(e) => warn!(script = %name, error = %e, "script panicked"),
    }
    name
}
