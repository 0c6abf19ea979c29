//! Script runtime with the fetch API registered.
//!
//! # Design
//! `FetchRuntime` owns one interpreter runtime and context. Registration
//! happens once, in `new`, and always in the same order:
//!
//! 1. timer and console primitives,
//! 2. the script artifact (which may capture `setTimeout` at top level),
//! 3. the bridge function, attached to the artifact's `fetch` entry point.
//!
//! The artifact therefore never observes the bridge before it is installed.
//! Everything runs on the caller's thread: `run_until_idle` drains promise
//! jobs, then sleeps until the next timer is due and fires it, until neither
//! jobs nor timers remain.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use fetch_core::Transport;
use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Runtime, Value};

use crate::bridge::{bridge_function, BRIDGE_FUNCTION};
use crate::console;
use crate::error::BridgeError;
use crate::script::ScriptArtifact;
use crate::timers::{self, SharedTimers};

/// Global the script artifact must define.
pub const ENTRY_POINT: &str = "fetch";

pub struct FetchRuntime {
    runtime: Runtime,
    context: Context,
    timers: SharedTimers,
}

impl FetchRuntime {
    /// Create a runtime, evaluate `script` and install the bridge bound to
    /// `transport`.
    pub fn new(script: &ScriptArtifact, transport: Transport) -> Result<Self, BridgeError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;
        let timers = SharedTimers::default();

        let transport = Arc::new(transport);
        context.with(|ctx| register(&ctx, script, transport, timers.clone()))?;

        tracing::debug!(artifact = script.name(), "fetch runtime ready");
        Ok(Self {
            runtime,
            context,
            timers,
        })
    }

    /// Evaluate script source, discarding its completion value.
    pub fn eval(&self, source: &str) -> Result<(), BridgeError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .catch(&ctx)
                .map_err(|e| BridgeError::Script(e.to_string()))
        })
    }

    /// Run `f` inside the context, e.g. to install extra globals or read
    /// results back.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(Ctx<'_>) -> R,
    {
        self.context.with(f)
    }

    /// Drain queued promise jobs. Returns how many ran.
    pub fn run_pending_jobs(&self) -> Result<usize, BridgeError> {
        let mut ran = 0;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => ran += 1,
                Ok(false) => return Ok(ran),
                Err(err) => {
                    let message = err.0.with(|ctx| {
                        CaughtError::from_error(&ctx, rquickjs::Error::Exception).to_string()
                    });
                    return Err(BridgeError::Job(message));
                }
            }
        }
    }

    /// Drive jobs and timers until nothing is left to run.
    pub fn run_until_idle(&self) -> Result<(), BridgeError> {
        loop {
            self.run_pending_jobs()?;

            let next = self.timers.borrow_mut().pop_next();
            let Some(timer) = next else {
                return Ok(());
            };

            let wait = timer.deadline.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                thread::sleep(wait);
            }

            tracing::trace!(id = timer.id, "firing timer");
            self.context.with(|ctx| {
                timers::fire(&ctx, timer.id)
                    .catch(&ctx)
                    .map_err(|e| BridgeError::Script(e.to_string()))
            })?;
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

/// Install timers, evaluate the artifact, then attach the bridge.
pub fn register<'js>(
    ctx: &Ctx<'js>,
    script: &ScriptArtifact,
    transport: Arc<Transport>,
    timers: SharedTimers,
) -> Result<(), BridgeError> {
    timers::install(ctx, timers)?;
    console::install(ctx)?;

    ctx.eval::<(), _>(script.source())
        .catch(ctx)
        .map_err(|e| BridgeError::Script(format!("{}: {e}", script.name())))?;

    let entry: Value = ctx.globals().get(ENTRY_POINT)?;
    let entry = entry
        .into_object()
        .ok_or(BridgeError::MissingEntryPoint(ENTRY_POINT))?;
    entry.set(BRIDGE_FUNCTION, bridge_function(ctx, transport)?)?;
    Ok(())
}
