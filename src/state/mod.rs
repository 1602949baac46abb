//! Shared state record
//!
//! The record is the only mutable resource shared by the coordinator and the
//! workers. It lives in a file that is used as addressable shared memory: every
//! access is a positioned read or write, never a seek on a shared cursor.
//!
//! # Layout
//!
//! ```text
//! offset 0   degree       u64 LE
//! offset 8   terms_done   u64 LE
//! offset 16  x            u64 LE
//! offset 24  accumulator  i64 LE
//! offset 32  identity table: degree + 1 participant ids, u64 LE each
//! ```
//!
//! The record carries no lock. Only the participant currently holding the
//! token may read-modify-write it, and the ring protocol guarantees there is
//! exactly one such participant at any instant.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size in bytes of the encoded [`StateHeader`]
pub const HEADER_LEN: u64 = 32;

/// Size in bytes of one identity table entry
pub const ENTRY_LEN: u64 = 8;

/// Raw identifier reserved for the coordinator in the identity table
const COORDINATOR_RAW_ID: u64 = u64::MAX;

/// Errors raised while accessing the shared state record
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot create state file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed state header: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("identity table has no entry for worker {0}")]
    MissingEntry(usize),

    #[error("cannot remove state file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fixed-size head of the shared state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHeader {
    /// Polynomial degree (n), fixed at creation
    pub degree: u64,
    /// Number of workers that contributed to the current round
    pub terms_done: u64,
    /// Current evaluation point
    pub x: u64,
    /// Running sum of the terms contributed this round
    pub accumulator: i64,
}

impl StateHeader {
    /// Header of a fresh record: first round at x = 0, nothing accumulated
    pub fn new(degree: u64) -> Self {
        Self {
            degree,
            terms_done: 0,
            x: 0,
            accumulator: 0,
        }
    }

    /// Number of workers in the ring (one per term)
    pub fn terms(&self) -> u64 {
        self.degree + 1
    }

    /// Whether every worker has contributed to the current round
    pub fn round_complete(&self) -> bool {
        self.terms_done == self.terms()
    }

    /// Reset the round counters and move to the next evaluation point
    pub fn advance(&mut self) {
        self.x += 1;
        self.terms_done = 0;
        self.accumulator = 0;
    }

    /// Encode into the fixed on-disk representation
    pub fn encode(&self) -> Result<Vec<u8>, StateError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the fixed on-disk representation
    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Identifier of a ring participant as stored in the identity table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantId {
    /// Worker at the given ring position
    Worker(usize),
    /// The coordinator, successor of the last worker
    Coordinator,
}

impl ParticipantId {
    pub fn to_raw(self) -> u64 {
        match self {
            ParticipantId::Worker(position) => position as u64,
            ParticipantId::Coordinator => COORDINATOR_RAW_ID,
        }
    }

    pub fn from_raw(raw: u64) -> Self {
        if raw == COORDINATOR_RAW_ID {
            ParticipantId::Coordinator
        } else {
            ParticipantId::Worker(raw as usize)
        }
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParticipantId::Worker(position) => write!(f, "worker {}", position),
            ParticipantId::Coordinator => write!(f, "coordinator"),
        }
    }
}

/// Handle on the file-backed shared state record
///
/// `SharedState` is `Sync`: positioned I/O takes `&self`, so every participant
/// can hold an `Arc<SharedState>`. Correctness relies on the token protocol,
/// not on this type.
#[derive(Debug)]
pub struct SharedState {
    path: PathBuf,
    file: File,
}

impl SharedState {
    /// Create (or truncate) the record file and write a fresh header
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Create`] if the file cannot be opened for writing,
    /// or an I/O error if the initial header cannot be written.
    pub fn create(path: &Path, degree: u64) -> Result<Self, StateError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| StateError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        let state = Self {
            path: path.to_path_buf(),
            file,
        };
        state.write_header(&StateHeader::new(degree))?;
        Ok(state)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the header at offset 0
    pub fn read_header(&self) -> Result<StateHeader, StateError> {
        let mut buf = [0u8; HEADER_LEN as usize];
        self.file.read_exact_at(&mut buf, 0)?;
        StateHeader::decode(&buf)
    }

    /// Overwrite the header at offset 0
    pub fn write_header(&self, header: &StateHeader) -> Result<(), StateError> {
        let bytes = header.encode()?;
        self.file.write_all_at(&bytes, 0)?;
        Ok(())
    }

    /// Append the identity table right after the header
    ///
    /// Entry `i` names the successor of worker `i`. Must be written once,
    /// before the first activation.
    pub fn write_identity_table(&self, ids: &[ParticipantId]) -> Result<(), StateError> {
        let mut bytes = Vec::with_capacity(ids.len() * ENTRY_LEN as usize);
        for id in ids {
            bytes.extend_from_slice(&id.to_raw().to_le_bytes());
        }
        self.file.write_all_at(&bytes, HEADER_LEN)?;
        Ok(())
    }

    /// Look up whom worker `position` hands the token to
    pub fn successor_of(&self, position: usize) -> Result<ParticipantId, StateError> {
        let mut buf = [0u8; ENTRY_LEN as usize];
        let offset = HEADER_LEN + position as u64 * ENTRY_LEN;
        self.file.read_exact_at(&mut buf, offset).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                StateError::MissingEntry(position)
            } else {
                StateError::Io(e)
            }
        })?;
        Ok(ParticipantId::from_raw(u64::from_le_bytes(buf)))
    }

    /// Close the record and remove its file
    pub fn discard(self) -> Result<(), StateError> {
        let Self { path, file } = self;
        drop(file);
        std::fs::remove_file(&path).map_err(|source| StateError::Remove { path, source })
    }
}
