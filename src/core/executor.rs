//! Unit execution: the executor trait and the default action executor.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::{Action, ProcessSpec, RunResult, UnitFailure, UnitMeta, WorkItem};

/// How long to keep draining output pipes after a timed-out process is killed.
const KILLED_OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Runs one work item to completion and reports its outcome.
///
/// Implementations must convert every failure of the unit into a failed
/// [`RunResult`]; the scheduler additionally catches panics, so a panicking
/// executor still yields exactly one result.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use unit_scheduler::core::{RunResult, UnitExecutor, WorkItem};
///
/// #[derive(Clone)]
/// struct DryRun;
///
/// #[async_trait]
/// impl UnitExecutor for DryRun {
///     async fn execute(&self, item: WorkItem) -> RunResult {
///         let (meta, _action) = item.into_parts();
///         RunResult::computed(meta, Default::default(), serde_json::Value::Null)
///     }
/// }
/// ```
#[async_trait]
pub trait UnitExecutor: Send + Sync + Clone + 'static {
    /// Run `item` and return its result. Duration excludes queue wait.
    async fn execute(&self, item: WorkItem) -> RunResult;
}

/// Default executor: awaits computations and spawns processes.
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    default_timeout: Option<Duration>,
}

impl ActionExecutor {
    /// Executor without a default process timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_timeout: None,
        }
    }

    /// Apply `timeout` to process units that do not set their own.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Timeout applied to process units without one.
    #[must_use]
    pub const fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    async fn run_process(&self, meta: UnitMeta, spec: ProcessSpec, started: Instant) -> RunResult {
        let limit = spec.timeout.or(self.default_timeout);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(unit_id = %meta.id, program = %spec.program, error = %e, "failed to spawn process");
                let failure = UnitFailure::Process {
                    exit_code: None,
                    detail: format!("failed to spawn `{}`: {e}", spec.program),
                };
                return RunResult::from_process(meta, started.elapsed(), String::new(), None, Some(failure));
            }
        };

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let mut stdout = tokio::spawn(read_stream(child.stdout.take(), Arc::clone(&stdout_buf)));
        let mut stderr = tokio::spawn(read_stream(child.stderr.take(), Arc::clone(&stderr_buf)));

        // The limit covers both the exit of the direct child and EOF on its pipes,
        // which stay open while any background descendant still holds them.
        let waited = {
            let finished = async {
                let status = child.wait().await;
                let _ = (&mut stdout).await;
                let _ = (&mut stderr).await;
                status
            };
            match limit {
                Some(limit) => tokio::time::timeout(limit, finished).await.ok(),
                None => Some(finished.await),
            }
        };

        let Some(waited) = waited else {
            // Only reachable when a limit was set.
            let limit = limit.unwrap_or_default();
            if let Err(e) = child.kill().await {
                debug!(unit_id = %meta.id, error = %e, "timed out process already exited");
            }
            let _ = tokio::time::timeout(KILLED_OUTPUT_GRACE, async {
                let _ = (&mut stdout).await;
                let _ = (&mut stderr).await;
            })
            .await;
            stdout.abort();
            stderr.abort();

            let mut output = take_output(&stdout_buf);
            output.push_str(&take_output(&stderr_buf));
            let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(unit_id = %meta.id, after_ms, "process timed out and was killed");
            return RunResult::from_process(
                meta,
                started.elapsed(),
                output,
                None,
                Some(UnitFailure::Timeout { after_ms }),
            );
        };

        let mut output = take_output(&stdout_buf);
        let stderr = take_output(&stderr_buf);
        output.push_str(&stderr);
        let duration = started.elapsed();

        match waited {
            Ok(status) if status.success() => {
                RunResult::from_process(meta, duration, output, status.code(), None)
            }
            Ok(status) => {
                let failure = UnitFailure::Process {
                    exit_code: status.code(),
                    detail: stderr,
                };
                RunResult::from_process(meta, duration, output, status.code(), Some(failure))
            }
            Err(e) => {
                let failure = UnitFailure::Process {
                    exit_code: None,
                    detail: format!("failed to wait for process: {e}"),
                };
                RunResult::from_process(meta, duration, output, None, Some(failure))
            }
        }
    }
}

#[async_trait]
impl UnitExecutor for ActionExecutor {
    async fn execute(&self, item: WorkItem) -> RunResult {
        let (meta, action) = item.into_parts();
        debug!(unit_id = %meta.id, name = %meta.name, "executing unit");
        let started = Instant::now();

        let result = match action {
            Action::Compute(compute) => match compute().await {
                Ok(value) => RunResult::computed(meta, started.elapsed(), value),
                Err(e) => RunResult::failed(
                    meta,
                    started.elapsed(),
                    UnitFailure::Action {
                        message: format!("{e:#}"),
                    },
                ),
            },
            Action::Process(spec) => self.run_process(meta, spec, started).await,
        };

        info!(
            unit_id = %result.id,
            success = result.success,
            duration_ms = result.duration_ms(),
            "unit finished"
        );
        result
    }
}

async fn read_stream<R>(stream: Option<R>, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!(error = %e, "output stream closed with error");
                break;
            }
        }
    }
}

fn take_output(buf: &Mutex<Vec<u8>>) -> String {
    String::from_utf8_lossy(&std::mem::take(&mut *buf.lock())).into_owned()
}
