//! Coordinator module
//!
//! Creates the shared state record and the worker ring, drives one round per
//! evaluation point, and tears everything down.
//!
//! # Lifecycle
//!
//! ```text
//! INIT -> ROUND_ACTIVE -> ROUND_COMPLETE -> ROUND_ACTIVE | SHUTDOWN
//!              |
//!            abort ----------------------> ABORT_SHUTDOWN
//! ```
//!
//! 1. **initialize**: create the record file with x = 0
//! 2. **spawn ring**: one worker thread per coefficient, identity table written
//! 3. **run rounds**: activate worker 0, wait for the token or an abort
//! 4. **shutdown**: broadcast termination, join every worker, remove the record
//!
//! Shutdown runs on every path once the record exists, so the record file never
//! outlives the run.

use crate::evaluator::TermEvaluator;
use crate::output::ResultSink;
use crate::ring::{self, Event, Ring, ShutdownHandle};
use crate::state::{ParticipantId, SharedState, StateError, StateHeader};
use crate::worker::{Worker, WorkerError};
use crossbeam::channel::Receiver;
use std::any::Any;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("polynomial needs at least one coefficient")]
    NoCoefficients,

    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to spawn worker {position}: {source}")]
    Spawn {
        position: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to activate the ring: {0}")]
    Activate(#[from] ring::RingError),

    #[error("worker {position} aborted the run: {reason}")]
    Aborted { position: usize, reason: String },

    #[error("worker {position} terminated abnormally: {exit}")]
    AbnormalExit { position: usize, exit: WorkerExit },

    #[error("round x={x} came back with {done} of {expected} terms")]
    IncompleteRound { x: u64, done: u64, expected: u64 },

    #[error("coordinator inbox closed during round x={x}")]
    InboxClosed { x: u64 },

    #[error("failed to emit result: {0}")]
    Output(#[source] io::Error),
}

/// How a worker thread ended
#[derive(Debug)]
pub enum WorkerExit {
    /// Terminated on the shutdown broadcast
    Clean { contributions: u64 },
    /// Returned an error after aborting the run
    Failed(WorkerError),
    /// Unwound with a panic
    Panicked(String),
}

impl WorkerExit {
    pub fn is_clean(&self) -> bool {
        matches!(self, WorkerExit::Clean { .. })
    }

    fn classify(joined: std::thread::Result<Result<u64, WorkerError>>) -> Self {
        match joined {
            Ok(Ok(contributions)) => WorkerExit::Clean { contributions },
            Ok(Err(e)) => WorkerExit::Failed(e),
            Err(payload) => WorkerExit::Panicked(panic_message(payload.as_ref())),
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Clean { contributions } => {
                write!(f, "exited cleanly after {} rounds", contributions)
            }
            WorkerExit::Failed(e) => write!(f, "failed: {}", e),
            WorkerExit::Panicked(msg) => write!(f, "panicked: {}", msg),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// p(0), p(1), ..., p(k)
    pub values: Vec<i64>,
    /// Number of workers in the ring (degree + 1)
    pub workers: usize,
    pub elapsed: Duration,
}

/// Live ring: channels and thread handles kept by the coordinator
struct RingHandles {
    ring: Arc<Ring>,
    events: Receiver<Event>,
    shutdown: ShutdownHandle,
    threads: Vec<(usize, JoinHandle<Result<u64, WorkerError>>)>,
}

/// Drives the evaluation of one polynomial over x = 0..=last_x
pub struct Coordinator {
    coefficients: Vec<i64>,
    state_path: PathBuf,
    evaluator: Arc<dyn TermEvaluator>,
}

impl Coordinator {
    /// Create a coordinator
    ///
    /// # Arguments
    ///
    /// * `coefficients` - a0..an, a0 being the constant term
    /// * `state_path` - file used for the shared state record
    /// * `evaluator` - capability every worker uses to compute its term
    pub fn new(
        coefficients: Vec<i64>,
        state_path: PathBuf,
        evaluator: Arc<dyn TermEvaluator>,
    ) -> Self {
        Self {
            coefficients,
            state_path,
            evaluator,
        }
    }

    fn degree(&self) -> u64 {
        self.coefficients.len().saturating_sub(1) as u64
    }

    /// Evaluate the polynomial at x = 0..=last_x
    ///
    /// Each value is emitted through `sink` as soon as its round completes.
    ///
    /// # Errors
    ///
    /// Returns the first failure observed. Even on error every worker has been
    /// joined and the state file removed (unless the file could not be created
    /// in the first place).
    pub fn run(&self, last_x: u64, sink: &mut dyn ResultSink) -> Result<RunSummary, RunError> {
        if self.coefficients.is_empty() {
            return Err(RunError::NoCoefficients);
        }
        let start = Instant::now();

        let state = Arc::new(self.initialize()?);
        let handles = match self.spawn_ring(&state) {
            Ok(handles) => handles,
            Err((e, partial)) => {
                let _ = self.shutdown(partial, state);
                return Err(e);
            }
        };

        let rounds = self.run_rounds(&handles, &state, last_x, sink);
        let shutdown = self.shutdown(handles, state);

        // An abort observed during the rounds explains any abnormal exit found
        // at shutdown, so it takes precedence.
        let values = rounds?;
        shutdown?;

        let summary = RunSummary {
            values,
            workers: self.coefficients.len(),
            elapsed: start.elapsed(),
        };
        info!(
            rounds = summary.values.len(),
            workers = summary.workers,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "evaluation complete"
        );
        Ok(summary)
    }

    /// INIT: create the record with termsDone = 0, x = 0, accumulator = 0
    fn initialize(&self) -> Result<SharedState, RunError> {
        let state = SharedState::create(&self.state_path, self.degree())?;
        debug!(path = %self.state_path.display(), degree = self.degree(), "state record created");
        Ok(state)
    }

    /// Spawn one worker per coefficient and write the identity table
    ///
    /// Worker 0 is the ring entry point, activated directly by the coordinator,
    /// so the table lists workers 1..=n followed by the coordinator. On failure
    /// the handles spawned so far are returned for shutdown.
    fn spawn_ring(&self, state: &Arc<SharedState>) -> Result<RingHandles, (RunError, RingHandles)> {
        let channels = ring::build(self.coefficients.len());
        let mut handles = RingHandles {
            ring: Arc::new(channels.ring),
            events: channels.events,
            shutdown: channels.shutdown,
            threads: Vec::with_capacity(self.coefficients.len()),
        };

        let mut identities = Vec::with_capacity(self.coefficients.len());
        for ((position, &coefficient), inbox) in
            self.coefficients.iter().enumerate().zip(channels.inboxes)
        {
            let worker = Worker::new(
                position,
                coefficient,
                Arc::clone(state),
                Arc::clone(&handles.ring),
                inbox,
                Arc::clone(&self.evaluator),
            );
            let position = worker.position();
            match worker.spawn() {
                Ok(thread) => handles.threads.push((position, thread)),
                Err(source) => return Err((RunError::Spawn { position, source }, handles)),
            }
            if position > 0 {
                identities.push(ParticipantId::Worker(position));
            }
        }
        identities.push(ParticipantId::Coordinator);

        if let Err(e) = state.write_identity_table(&identities) {
            return Err((e.into(), handles));
        }
        debug!(workers = handles.threads.len(), evaluator = self.evaluator.name(), "ring spawned");
        Ok(handles)
    }

    /// ROUND_ACTIVE / ROUND_COMPLETE loop
    fn run_rounds(
        &self,
        handles: &RingHandles,
        state: &SharedState,
        last_x: u64,
        sink: &mut dyn ResultSink,
    ) -> Result<Vec<i64>, RunError> {
        let mut values = Vec::new();
        let mut x = 0;
        handles.ring.pass_token(ParticipantId::Worker(0))?;

        loop {
            match handles.events.recv() {
                Ok(Event::RoundComplete) => {
                    let mut header: StateHeader = state.read_header()?;
                    if !header.round_complete() {
                        return Err(RunError::IncompleteRound {
                            x: header.x,
                            done: header.terms_done,
                            expected: header.terms(),
                        });
                    }
                    debug!(x = header.x, value = header.accumulator, "round complete");
                    sink.emit(header.x, header.accumulator)
                        .map_err(RunError::Output)?;
                    values.push(header.accumulator);

                    if header.x >= last_x {
                        return Ok(values);
                    }
                    header.advance();
                    x = header.x;
                    state.write_header(&header)?;
                    handles.ring.pass_token(ParticipantId::Worker(0))?;
                }
                Ok(Event::Abort { position, reason }) => {
                    error!(position, %reason, x, "run aborted by worker");
                    return Err(RunError::Aborted { position, reason });
                }
                Err(_) => return Err(RunError::InboxClosed { x }),
            }
        }
    }

    /// SHUTDOWN: broadcast termination, join everyone, remove the record
    ///
    /// Reports the first abnormal exit, or a failure to remove the record.
    fn shutdown(&self, handles: RingHandles, state: Arc<SharedState>) -> Result<(), RunError> {
        let RingHandles {
            ring,
            events,
            mut shutdown,
            threads,
        } = handles;
        shutdown.broadcast();

        let mut first_abnormal = None;
        for (position, thread) in threads {
            let exit = WorkerExit::classify(thread.join());
            if exit.is_clean() {
                debug!(position, %exit, "worker joined");
            } else {
                warn!(position, %exit, "worker terminated abnormally");
                first_abnormal.get_or_insert(RunError::AbnormalExit { position, exit });
            }
        }
        drop(events);
        drop(ring);

        // Every worker has been joined, so this is the last reference
        let removed = match Arc::try_unwrap(state) {
            Ok(state) => state.discard(),
            Err(shared) => std::fs::remove_file(shared.path()).map_err(|source| StateError::Remove {
                path: shared.path().to_path_buf(),
                source,
            }),
        };

        match first_abnormal {
            Some(e) => Err(e),
            None => removed.map_err(RunError::from),
        }
    }
}
