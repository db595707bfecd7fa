// src/error.rs

use crate::models::{ConnectionId, ErrorKind, RoomKey};
use thiserror::Error;

/// Everything that can go wrong while relaying for a single connection.
///
/// None of these are fatal to the relay: the websocket layer turns them into
/// an `error` event for the offending client and keeps serving everyone else.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("join request has an empty `{field}`")]
    InvalidJoinRequest { field: &'static str },

    #[error("connection has not joined a room")]
    NotJoined,

    #[error("message addressed to room '{requested}' but connection is in room '{joined}'")]
    RoomMismatch { joined: RoomKey, requested: RoomKey },

    #[error("connection {0} is not tracked by the relay")]
    UnknownConnection(ConnectionId),

    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RelayError {
    /// The kind reported to clients in an `error` event.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::InvalidJoinRequest { .. } => ErrorKind::InvalidJoinRequest,
            RelayError::NotJoined => ErrorKind::NotJoined,
            RelayError::RoomMismatch { .. } => ErrorKind::RoomMismatch,
            RelayError::UnknownConnection(_) => ErrorKind::UnknownConnection,
            RelayError::MalformedEvent(_) => ErrorKind::MalformedEvent,
            RelayError::Config(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
