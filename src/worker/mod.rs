//! Worker thread implementation
//!
//! A worker owns exactly one polynomial term `coefficient * x^position`. It
//! spends its life waiting for the token, and whenever the token arrives it
//! folds its term into the shared state record and hands the token on.
//!
//! # States
//!
//! ```text
//! WAIT_ACTIVATE --activate--> COMPUTE --token passed--> WAIT_ACTIVATE
//!       |                        |
//!   terminate                  error --abort to coordinator--> TERMINATED
//!       v
//!   TERMINATED
//! ```
//!
//! # Error policy
//!
//! Any failure during COMPUTE is fatal for the whole run. Before returning the
//! error the worker notifies the coordinator with an abort, so the coordinator
//! is never left waiting for a token that will not come back. A panic takes the
//! same path through [`AbortOnPanic`].

use crate::evaluator::{self, EvalError, TermEvaluator};
use crate::ring::{Notification, Ring, RingError, WorkerInbox};
use crate::state::{SharedState, StateError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that end a worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("term evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("accumulator overflow at x={x}")]
    Overflow { x: u64 },

    #[error("evaluation point {0} does not fit in a 64-bit signed integer")]
    PointOutOfRange(u64),

    #[error("activated out of turn: expected {expected} prior contributions, found {found}")]
    OutOfTurn { expected: u64, found: u64 },
}

/// Sends an abort to the coordinator if the worker unwinds
struct AbortOnPanic {
    ring: Arc<Ring>,
    position: usize,
}

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.ring.abort(self.position, "worker panicked");
        }
    }
}

/// One participant of the ring, responsible for a single term
pub struct Worker {
    /// Ring position, also the power of x this worker computes
    position: usize,

    coefficient: i64,

    state: Arc<SharedState>,

    ring: Arc<Ring>,

    inbox: WorkerInbox,

    evaluator: Arc<dyn TermEvaluator>,

    /// Rounds this worker has contributed to
    contributions: u64,
}

impl Worker {
    /// Create a worker bound to its coefficient and ring position
    pub fn new(
        position: usize,
        coefficient: i64,
        state: Arc<SharedState>,
        ring: Arc<Ring>,
        inbox: WorkerInbox,
        evaluator: Arc<dyn TermEvaluator>,
    ) -> Self {
        Self {
            position,
            coefficient,
            state,
            ring,
            inbox,
            evaluator,
            contributions: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Run the worker on its own named OS thread
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be created.
    pub fn spawn(self) -> io::Result<JoinHandle<Result<u64, WorkerError>>> {
        thread::Builder::new()
            .name(format!("poly-worker-{}", self.position))
            .spawn(move || self.run())
    }

    /// Main loop
    ///
    /// Returns the number of rounds contributed to once the ring shuts down.
    ///
    /// # Errors
    ///
    /// Returns the failure that ended the worker. The coordinator has already
    /// been sent an abort by the time this returns.
    pub fn run(mut self) -> Result<u64, WorkerError> {
        let _guard = AbortOnPanic {
            ring: Arc::clone(&self.ring),
            position: self.position,
        };

        loop {
            match self.inbox.wait() {
                Notification::Terminate => {
                    debug!(
                        position = self.position,
                        contributions = self.contributions,
                        "worker terminating"
                    );
                    return Ok(self.contributions);
                }
                Notification::Activate => {
                    if let Err(e) = self.contribute() {
                        self.ring.abort(self.position, e.to_string());
                        return Err(e);
                    }
                }
            }
        }
    }

    /// COMPUTE: fold this worker's term into the record and pass the token on
    fn contribute(&mut self) -> Result<(), WorkerError> {
        let mut header = self.state.read_header()?;

        // The token travels in ring order, so exactly `position` workers have
        // contributed before us this round.
        if header.terms_done != self.position as u64 {
            return Err(WorkerError::OutOfTurn {
                expected: self.position as u64,
                found: header.terms_done,
            });
        }

        let x = i64::try_from(header.x).map_err(|_| WorkerError::PointOutOfRange(header.x))?;
        let factors = evaluator::term_factors(self.coefficient, x, self.position);
        let term = self.evaluator.product(&factors)?;
        trace!(position = self.position, x, term, "term computed");

        header.accumulator = header
            .accumulator
            .checked_add(term)
            .ok_or(WorkerError::Overflow { x: header.x })?;
        header.terms_done += 1;
        self.state.write_header(&header)?;
        self.contributions += 1;

        let successor = self.state.successor_of(self.position)?;
        self.ring.pass_token(successor)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::mock::MockEvaluator;
    use crate::ring::{self, Event};
    use crate::state::{ParticipantId, StateHeader};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        state: Arc<SharedState>,
        channels: ring::RingChannels,
    }

    /// Single-worker ring whose successor is the coordinator
    fn harness(x: u64) -> Harness {
        let dir = TempDir::new().unwrap();
        let state = SharedState::create(&dir.path().join("state"), 0).unwrap();
        state
            .write_identity_table(&[ParticipantId::Coordinator])
            .unwrap();
        let mut header = state.read_header().unwrap();
        header.x = x;
        state.write_header(&header).unwrap();

        Harness {
            _dir: dir,
            state: Arc::new(state),
            channels: ring::build(1),
        }
    }

    fn spawn_worker(
        h: &mut Harness,
        coefficient: i64,
        evaluator: MockEvaluator,
    ) -> (Arc<Ring>, JoinHandle<Result<u64, WorkerError>>) {
        let ring = Arc::new(std::mem::replace(&mut h.channels.ring, ring::build(0).ring));
        let inbox = h.channels.inboxes.pop().unwrap();
        let worker = Worker::new(
            0,
            coefficient,
            Arc::clone(&h.state),
            Arc::clone(&ring),
            inbox,
            Arc::new(evaluator),
        );
        (ring, worker.spawn().unwrap())
    }

    #[test]
    fn test_worker_contributes_and_returns_token() {
        let mut h = harness(3);
        let eval = MockEvaluator::new();
        let (ring, handle) = spawn_worker(&mut h, 4, eval.clone());

        ring.pass_token(ParticipantId::Worker(0)).unwrap();
        let event = h.channels.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, Event::RoundComplete);

        let header = h.state.read_header().unwrap();
        assert_eq!(header.accumulator, 4);
        assert_eq!(header.terms_done, 1);
        assert_eq!(eval.calls(), vec![vec![4]]);

        h.channels.shutdown.broadcast();
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_worker_exits_cleanly_without_activation() {
        let mut h = harness(0);
        let (_ring, handle) = spawn_worker(&mut h, 1, MockEvaluator::new());

        h.channels.shutdown.broadcast();
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }

    #[test]
    fn test_worker_failure_aborts_coordinator() {
        let mut h = harness(1);
        let eval = MockEvaluator::new();
        eval.set_should_fail(true);
        let (ring, handle) = spawn_worker(&mut h, 2, eval);

        ring.pass_token(ParticipantId::Worker(0)).unwrap();
        let event = h.channels.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, Event::Abort { position: 0, .. }));
        assert!(matches!(handle.join().unwrap(), Err(WorkerError::Eval(_))));

        // Record untouched by the failed contribution
        assert_eq!(h.state.read_header().unwrap().terms_done, 0);
    }

    #[test]
    fn test_worker_rejects_out_of_turn_activation() {
        let mut h = harness(0);
        h.state
            .write_header(&StateHeader {
                degree: 0,
                terms_done: 1,
                x: 0,
                accumulator: 0,
            })
            .unwrap();
        let (ring, handle) = spawn_worker(&mut h, 2, MockEvaluator::new());

        ring.pass_token(ParticipantId::Worker(0)).unwrap();
        let event = h.channels.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(event, Event::Abort { .. }));
        assert!(matches!(
            handle.join().unwrap(),
            Err(WorkerError::OutOfTurn { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn test_worker_panic_still_aborts() {
        let mut h = harness(0);
        let eval = MockEvaluator::new();
        eval.set_should_panic(true);
        let (ring, handle) = spawn_worker(&mut h, 2, eval);

        ring.pass_token(ParticipantId::Worker(0)).unwrap();
        let event = h.channels.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            event,
            Event::Abort {
                position: 0,
                reason: "worker panicked".to_string()
            }
        );
        assert!(handle.join().is_err());
    }

    #[test]
    fn test_accumulator_overflow_is_an_error() {
        let mut h = harness(0);
        h.state
            .write_header(&StateHeader {
                degree: 0,
                terms_done: 0,
                x: 0,
                accumulator: i64::MAX,
            })
            .unwrap();
        let (ring, handle) = spawn_worker(&mut h, 1, MockEvaluator::new());

        ring.pass_token(ParticipantId::Worker(0)).unwrap();
        let _ = h.channels.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            handle.join().unwrap(),
            Err(WorkerError::Overflow { x: 0 })
        ));
    }
}
