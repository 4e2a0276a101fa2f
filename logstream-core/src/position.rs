//! Coordinates within the global log and within a single stream.

use std::fmt;

use crate::error::InvalidPosition;

/// An event's `(commit, prepare)` coordinate within the global log.
///
/// Positions are ordered by commit coordinate first, then by prepare
/// coordinate. The commit coordinate is never behind the prepare coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    commit: u64,
    prepare: u64,
}

impl Position {
    /// The beginning of the log.
    pub const START: Position = Position {
        commit: 0,
        prepare: 0,
    };

    /// The end of the log.
    pub const END: Position = Position {
        commit: u64::MAX,
        prepare: u64::MAX,
    };

    pub fn new(commit: u64, prepare: u64) -> Result<Self, InvalidPosition> {
        if commit < prepare {
            return Err(InvalidPosition { commit, prepare });
        }
        Ok(Position { commit, prepare })
    }

    pub fn commit(&self) -> u64 {
        self.commit
    }

    pub fn prepare(&self) -> u64 {
        self.prepare
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{}/P:{}", self.commit, self.prepare)
    }
}

/// The revision a writer expects the target stream to be at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpectedRevision {
    /// The stream's last event has exactly this revision.
    Exact(u64),
    /// No concurrency check.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must exist, at any revision.
    StreamExists,
}

impl fmt::Display for ExpectedRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedRevision::Exact(revision) => write!(f, "{revision}"),
            ExpectedRevision::Any => f.write_str("any"),
            ExpectedRevision::NoStream => f.write_str("no stream"),
            ExpectedRevision::StreamExists => f.write_str("stream exists"),
        }
    }
}

/// The revision a stream was observed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurrentRevision {
    Current(u64),
    NoStream,
}

impl CurrentRevision {
    /// The revision, or `None` when the stream does not exist.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CurrentRevision::Current(revision) => Some(*revision),
            CurrentRevision::NoStream => None,
        }
    }
}

impl fmt::Display for CurrentRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentRevision::Current(revision) => write!(f, "{revision}"),
            CurrentRevision::NoStream => f.write_str("no stream"),
        }
    }
}

/// Where a read starts.
///
/// `T` is a stream revision (`u64`) for stream reads and a [`Position`] for
/// reads over the whole log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPosition<T> {
    Start,
    End,
    Position(T),
}

/// Where a catch-up subscription starts. `After(x)` delivers events strictly
/// after `x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionStart<T> {
    Start,
    End,
    After(T),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forwards,
    Backwards,
}
