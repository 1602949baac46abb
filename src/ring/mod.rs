//! Ring signaling
//!
//! Participants never share a lock. They coordinate through three kinds of
//! channel:
//!
//! - **Activation**: one single-slot channel per worker. Receiving the
//!   [`Token`] is the activation; the receive itself empties the slot, so an
//!   activation can neither be lost nor observed twice.
//! - **Coordinator inbox**: carries [`Event::RoundComplete`] when the last
//!   worker hands the token back, and [`Event::Abort`] when a worker fails.
//! - **Shutdown broadcast**: a channel that is never written to. Dropping its
//!   only sender disconnects every worker's receiver at once, which every
//!   worker observes whatever state it is in.
//!
//! The ring order itself is not encoded here: workers look up their successor
//! in the identity table of the shared state record and pass the token through
//! [`Ring::pass_token`].

use crate::state::ParticipantId;
use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, warn};

/// The exclusive right to mutate the shared state record
#[derive(Debug)]
pub struct Token;

/// Messages received by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The token came back: every worker contributed to the round
    RoundComplete,
    /// A worker failed and is terminating
    Abort { position: usize, reason: String },
}

/// What a waiting worker was woken up by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Activate,
    Terminate,
}

/// Errors raised while passing the token
#[derive(Debug, Error)]
pub enum RingError {
    #[error("{0} is not part of the ring")]
    UnknownParticipant(ParticipantId),

    #[error("{0} is no longer reachable")]
    Unreachable(ParticipantId),

    #[error("{0} already holds a pending activation")]
    TokenCollision(ParticipantId),
}

/// Sending halves of every participant's channel, indexed by identifier
#[derive(Debug)]
pub struct Ring {
    workers: Vec<Sender<Token>>,
    coordinator: Sender<Event>,
}

impl Ring {
    /// Number of workers in the ring
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Hand the token to `to`
    ///
    /// A worker's slot holds at most one token. Finding it occupied means two
    /// participants believed they held the token, which is reported rather than
    /// queued.
    pub fn pass_token(&self, to: ParticipantId) -> Result<(), RingError> {
        debug!(%to, "passing token");
        match to {
            ParticipantId::Worker(position) => {
                let sender = self
                    .workers
                    .get(position)
                    .ok_or(RingError::UnknownParticipant(to))?;
                sender.try_send(Token).map_err(|e| match e {
                    TrySendError::Full(_) => RingError::TokenCollision(to),
                    TrySendError::Disconnected(_) => RingError::Unreachable(to),
                })
            }
            ParticipantId::Coordinator => self
                .coordinator
                .send(Event::RoundComplete)
                .map_err(|_| RingError::Unreachable(to)),
        }
    }

    /// Tell the coordinator that worker `position` is giving up
    ///
    /// Best effort: if the coordinator is already gone there is nobody left to
    /// unblock.
    pub fn abort(&self, position: usize, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(position, %reason, "worker aborting the run");
        if self
            .coordinator
            .send(Event::Abort { position, reason })
            .is_err()
        {
            debug!(position, "coordinator gone, abort dropped");
        }
    }
}

/// Receiving side owned by one worker
#[derive(Debug)]
pub struct WorkerInbox {
    activate: Receiver<Token>,
    shutdown: Receiver<()>,
}

impl WorkerInbox {
    /// Block until the worker is activated or the ring shuts down
    pub fn wait(&self) -> Notification {
        crossbeam::select! {
            recv(self.activate) -> token => match token {
                Ok(Token) => Notification::Activate,
                Err(_) => Notification::Terminate,
            },
            recv(self.shutdown) -> _ => Notification::Terminate,
        }
    }
}

/// Owner of the shutdown broadcast
#[derive(Debug)]
pub struct ShutdownHandle(Option<Sender<()>>);

impl ShutdownHandle {
    /// Wake every worker with a termination notification. Idempotent.
    pub fn broadcast(&mut self) {
        if self.0.take().is_some() {
            debug!("shutdown broadcast");
        }
    }
}

/// All channels of a freshly built ring
#[derive(Debug)]
pub struct RingChannels {
    pub ring: Ring,
    pub inboxes: Vec<WorkerInbox>,
    pub events: Receiver<Event>,
    pub shutdown: ShutdownHandle,
}

/// Build the channels for a ring of `workers` workers plus the coordinator
pub fn build(workers: usize) -> RingChannels {
    let (coordinator, events) = unbounded();
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

    let mut senders = Vec::with_capacity(workers);
    let mut inboxes = Vec::with_capacity(workers);
    for _ in 0..workers {
        let (tx, rx) = bounded(1);
        senders.push(tx);
        inboxes.push(WorkerInbox {
            activate: rx,
            shutdown: shutdown_rx.clone(),
        });
    }

    RingChannels {
        ring: Ring {
            workers: senders,
            coordinator,
        },
        inboxes,
        events,
        shutdown: ShutdownHandle(Some(shutdown_tx)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_reaches_worker() {
        let channels = build(2);
        channels.ring.pass_token(ParticipantId::Worker(1)).unwrap();
        assert_eq!(channels.inboxes[1].wait(), Notification::Activate);
    }

    #[test]
    fn test_token_back_to_coordinator() {
        let channels = build(1);
        channels.ring.pass_token(ParticipantId::Coordinator).unwrap();
        assert_eq!(channels.events.try_recv().unwrap(), Event::RoundComplete);
    }

    #[test]
    fn test_second_token_is_a_collision() {
        let channels = build(1);
        channels.ring.pass_token(ParticipantId::Worker(0)).unwrap();
        assert!(matches!(
            channels.ring.pass_token(ParticipantId::Worker(0)),
            Err(RingError::TokenCollision(ParticipantId::Worker(0)))
        ));
    }

    #[test]
    fn test_unknown_and_unreachable_workers() {
        let mut channels = build(2);
        assert!(matches!(
            channels.ring.pass_token(ParticipantId::Worker(5)),
            Err(RingError::UnknownParticipant(_))
        ));

        channels.inboxes.remove(1);
        assert!(matches!(
            channels.ring.pass_token(ParticipantId::Worker(1)),
            Err(RingError::Unreachable(_))
        ));
    }

    #[test]
    fn test_abort_reaches_coordinator() {
        let channels = build(3);
        channels.ring.abort(2, "boom");
        assert_eq!(
            channels.events.try_recv().unwrap(),
            Event::Abort {
                position: 2,
                reason: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_shutdown_wakes_waiting_worker() {
        let mut channels = build(1);
        let inbox = channels.inboxes.pop().unwrap();

        let waiter = std::thread::spawn(move || inbox.wait());
        std::thread::sleep(Duration::from_millis(20));
        channels.shutdown.broadcast();
        channels.shutdown.broadcast();

        assert_eq!(waiter.join().unwrap(), Notification::Terminate);
    }
}
