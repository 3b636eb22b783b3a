//! Batch runner
//!
//! Discovers the input grids, runs the pipeline on a fixed-size worker pool
//! and funnels the records through a channel to a single writer, which
//! appends them to the results table in discovery order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::backend::{GeoBackend, NativeBackend};
use crate::config::ExtentConfig;
use crate::error::{ExtentError, ExtentResult};
use crate::pipeline::{extract_area_with, AreaReport};
use crate::table::ResultTable;
use crate::utils::progress::ProgressTracker;

/// Cooperative stop signal shared between a caller and a running batch
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the batch from starting further inputs
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels this token on SIGINT or SIGTERM
    ///
    /// A background thread waits for the signal. The first one lets the
    /// batch finish the grids in flight and report; a second one exits the
    /// process with status 130.
    pub fn cancel_on_interrupt(&self) {
        let token = self.clone();
        let spawned = thread::Builder::new()
            .name("interrupt".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        warn!("Interrupt handling unavailable: {}", e);
                        return;
                    },
                };
                runtime.block_on(async {
                    if !wait_for_interrupt().await {
                        return;
                    }
                    warn!("Interrupted: finishing the grids in flight, press Ctrl-C again to abort");
                    token.cancel();

                    if wait_for_interrupt().await {
                        error!("Aborted");
                        std::process::exit(130);
                    }
                });
            });

        if let Err(e) = spawned {
            warn!("Interrupt handling unavailable: {}", e);
        }
    }
}

/// Waits for SIGINT or SIGTERM; false when the handlers cannot be installed
async fn wait_for_interrupt() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
                true
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot install signal handlers: {}", e);
                false
            },
        }
    }
    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot install the Ctrl-C handler: {}", e);
                false
            },
        }
    }
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Inputs that went through the pipeline, successfully or not
    pub processed: usize,
    pub succeeded: usize,
    /// Successful inputs without any ice cell
    pub empty: usize,
    /// Failed inputs and the reason
    pub failed: Vec<(PathBuf, String)>,
    /// Sum of the recorded areas
    pub total_area: f64,
    /// The batch stopped before every input was processed
    pub cancelled: bool,
}

impl BatchSummary {
    /// 0 when every input succeeded, 1 when some failed, 2 when the batch
    /// was stopped early without a failure
    pub fn exit_code(&self) -> i32 {
        if !self.failed.is_empty() {
            1
        } else if self.cancelled {
            2
        } else {
            0
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} succeeded ({} empty), {} failed, total area {}",
            self.processed, self.succeeded, self.empty, self.failed.len(), self.total_area
        )?;
        if self.cancelled {
            write!(f, ", stopped early")?;
        }
        Ok(())
    }
}

/// Process exit code of a batch outcome; fatal errors map to 2
pub fn exit_code(outcome: &ExtentResult<BatchSummary>) -> i32 {
    match outcome {
        Ok(summary) => summary.exit_code(),
        Err(_) => 2,
    }
}

/// Input grids matching the configured glob
///
/// Lexicographically sorted when `sort_inputs` is set, listing order
/// otherwise. Unreadable directory entries are skipped with a warning.
pub fn discover_inputs(config: &ExtentConfig) -> ExtentResult<Vec<PathBuf>> {
    let pattern = config.input_glob();
    let entries = glob::glob(&pattern)
        .map_err(|e| ExtentError::Discovery(format!("invalid pattern '{}': {}", pattern, e)))?;

    let mut inputs = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => inputs.push(path),
            Ok(_) => {},
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }

    if config.sort_inputs {
        inputs.sort();
    }
    info!("Found {} inputs matching {}", inputs.len(), pattern);
    Ok(inputs)
}

/// Runs the pipeline over every input with the native backend
pub fn run_batch(
    config: &ExtentConfig,
    table: &mut dyn ResultTable,
    cancel: &CancellationToken,
) -> ExtentResult<BatchSummary> {
    run_batch_with(&NativeBackend, config, table, cancel)
}

/// Runs the pipeline over every input with the given backend
///
/// # Errors
/// `Config` or `Discovery` before any input is touched; `Storage` when the
/// table cannot be created or appended to, after which no further record is
/// written. Per-input failures are reported in the summary instead.
pub fn run_batch_with(
    backend: &dyn GeoBackend,
    config: &ExtentConfig,
    table: &mut dyn ResultTable,
    cancel: &CancellationToken,
) -> ExtentResult<BatchSummary> {
    config.validate()?;
    let inputs = discover_inputs(config)?;
    table.ensure_exists()?;

    let mut summary = BatchSummary::default();
    if inputs.is_empty() {
        warn!("No inputs match {}", config.input_glob());
        return Ok(summary);
    }

    let workers = config.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ExtentError::Config(format!("cannot start {} workers: {}", workers, e)))?;
    info!("Processing {} inputs on {} workers into {}", inputs.len(), workers, table.location());

    let progress = ProgressTracker::new(inputs.len() as u64, "extracting");
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, ExtentResult<AreaReport>)>();

    let mut fatal: Option<ExtentError> = None;

    thread::scope(|scope| {
        let inputs = &inputs;
        let stop = &stop;
        let pool = &pool;

        scope.spawn(move || {
            pool.install(|| {
                inputs.par_iter().enumerate().for_each_with(tx, |tx, (index, path)| {
                    let result = if cancel.is_cancelled() || stop.load(Ordering::SeqCst) {
                        Err(ExtentError::Cancelled)
                    } else {
                        extract_area_with(backend, path, config)
                    };
                    // the writer hangs up only after a fatal error
                    let _ = tx.send((index, result));
                });
            });
        });

        let mut pending: BTreeMap<usize, ExtentResult<AreaReport>> = BTreeMap::new();
        let mut next = 0;

        for (index, result) in rx {
            pending.insert(index, result);

            while let Some(result) = pending.remove(&next) {
                let path = &inputs[next];
                next += 1;
                progress.increment(1);

                if stop.load(Ordering::SeqCst) {
                    summary.cancelled = true;
                    continue;
                }

                match result {
                    Ok(report) => {
                        if let Err(e) = table.append(&report.record) {
                            error!("Cannot append to {}: {}", table.location(), e);
                            stop.store(true, Ordering::SeqCst);
                            fatal = Some(e);
                            continue;
                        }
                        summary.processed += 1;
                        summary.succeeded += 1;
                        summary.total_area += report.record.total_area;
                        if report.empty_mask {
                            summary.empty += 1;
                        }
                        progress.set_message(&report.record.source_identifier);
                    },
                    Err(ExtentError::Cancelled) => {
                        summary.cancelled = true;
                    },
                    Err(e) => {
                        error!("{}: {}", path.display(), e);
                        summary.processed += 1;
                        summary.failed.push((path.clone(), e.to_string()));
                        if config.fail_fast {
                            warn!("Stopping after the first failure");
                            stop.store(true, Ordering::SeqCst);
                            summary.cancelled = next < inputs.len();
                        }
                    },
                }
            }
        }
    });

    progress.finish(&summary.to_string());

    if let Some(e) = fatal {
        return Err(e);
    }
    info!("Batch finished: {}", summary);
    Ok(summary)
}
