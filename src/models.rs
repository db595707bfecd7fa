// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Identifier assigned to every accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How the two participant identities are turned into a room key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoomKeying {
    /// `(A, B)` and `(B, A)` are different rooms.
    #[default]
    Ordered,
    /// The pair is sorted first, so both orders meet in one room.
    Canonical,
}

impl FromStr for RoomKeying {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ordered" => Ok(RoomKeying::Ordered),
            "canonical" => Ok(RoomKeying::Canonical),
            other => Err(format!(
                "unknown room keying '{other}', expected 'ordered' or 'canonical'"
            )),
        }
    }
}

/// A conversation room, keyed by the user/trainer pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey {
    user_id: String,
    trainer_id: String,
}

impl RoomKey {
    pub fn new(keying: RoomKeying, user_id: &str, trainer_id: &str) -> Self {
        let (first, second) = match keying {
            RoomKeying::Canonical if trainer_id < user_id => (trainer_id, user_id),
            _ => (user_id, trainer_id),
        };
        Self {
            user_id: first.to_string(),
            trainer_id: second.to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn trainer_id(&self) -> &str {
        &self.trainer_id
    }
}

/// Renders as `user-trainer`. A `-` or `\` inside either id is escaped with
/// a backslash so that distinct pairs never render the same name.
impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, self.user_id())?;
        f.write_str("-")?;
        write_escaped(f, self.trainer_id())
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, id: &str) -> fmt::Result {
    for c in id.chars() {
        if c == '-' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

/// Which side of the conversation sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Trainer,
}

/// An event sent from a client to the relay.
/// Deserialized from incoming JSON text.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    #[serde(alias = "join-chat")]
    Join {
        #[serde(alias = "participantA")]
        user_id: String,
        #[serde(alias = "participantB")]
        trainer_id: String,
    },
    #[serde(alias = "send-message")]
    Message {
        content: String,
        #[serde(alias = "senderType")]
        sender_role: SenderRole,
        #[serde(default, alias = "participantA")]
        user_id: Option<String>,
        #[serde(default, alias = "participantB")]
        trainer_id: Option<String>,
    },
}

/// Error kinds surfaced to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidJoinRequest,
    NotJoined,
    RoomMismatch,
    UnknownConnection,
    MalformedEvent,
    Internal,
}

/// An event sent from the relay to a client.
/// Serialized into JSON text for sending.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Message {
        content: String,
        sender_role: SenderRole,
        timestamp: DateTime<Utc>,
    },
    Joined {
        room: String,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}
