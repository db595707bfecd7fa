// src/registry.rs

//! Room and connection bookkeeping for the relay.
//!
//! The registry is the single owner of every live connection's outbound
//! queue. Rooms only hold connection ids, and a room entry is removed as
//! soon as its last member leaves.

use crate::{
    error::{RelayError, Result},
    models::{ConnectionId, RoomKey, RoomKeying, SenderRole, ServerEvent},
};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, info, warn};

/// A live client session as seen by the relay.
struct Connection {
    room: Option<RoomKey>,
    outbound: Sender<ServerEvent>,
}

pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
    keying: RoomKeying,
    outbound_buffer: usize,
}

impl Registry {
    pub fn new(keying: RoomKeying, outbound_buffer: usize) -> Self {
        Self {
            connections: HashMap::new(),
            rooms: HashMap::new(),
            keying,
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Tracks a newly accepted connection. The returned receiver yields every
    /// event addressed to it; it closes when the connection is dropped.
    pub fn connect(&mut self) -> (ConnectionId, Receiver<ServerEvent>) {
        let id = ConnectionId::new();
        let (outbound, rx) = mpsc::channel(self.outbound_buffer);
        self.connections.insert(id, Connection { room: None, outbound });
        debug!(connection = %id, "connection tracked");
        (id, rx)
    }

    /// Puts a connection in the room for `(user_id, trainer_id)`, leaving
    /// whatever room it was in before.
    pub fn join(&mut self, id: ConnectionId, user_id: &str, trainer_id: &str) -> Result<RoomKey> {
        if user_id.trim().is_empty() {
            return Err(RelayError::InvalidJoinRequest { field: "userId" });
        }
        if trainer_id.trim().is_empty() {
            return Err(RelayError::InvalidJoinRequest { field: "trainerId" });
        }
        if !self.connections.contains_key(&id) {
            return Err(RelayError::UnknownConnection(id));
        }

        let key = RoomKey::new(self.keying, user_id, trainer_id);
        let previous = self
            .connections
            .get_mut(&id)
            .and_then(|connection| connection.room.replace(key.clone()));

        if let Some(previous) = previous {
            if previous == key {
                return Ok(key);
            }
            self.leave_room(id, &previous);
        }

        self.rooms.entry(key.clone()).or_default().insert(id);
        info!(connection = %id, room = %key, "joined room");
        Ok(key)
    }

    /// Stamps a message and queues it for every member of the sender's room,
    /// the sender included. Returns how many members it was queued for.
    pub fn send(
        &mut self,
        id: ConnectionId,
        content: &str,
        sender_role: SenderRole,
    ) -> Result<usize> {
        let key = self.room_of(id)?.ok_or(RelayError::NotJoined)?.clone();

        let event = ServerEvent::Message {
            content: content.to_string(),
            sender_role,
            timestamp: Utc::now(),
        };

        let members = match self.rooms.get(&key) {
            Some(members) => members,
            None => return Ok(0),
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for member in members {
            let Some(connection) = self.connections.get(member) else {
                stale.push(*member);
                continue;
            };
            match connection.outbound.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        connection = %member,
                        room = %key,
                        "outbound queue full, dropping message"
                    );
                }
                Err(TrySendError::Closed(_)) => stale.push(*member),
            }
        }

        for member in stale {
            debug!(connection = %member, room = %key, "removing closed connection");
            self.disconnect(member);
        }

        debug!(connection = %id, room = %key, delivered, "message relayed");
        Ok(delivered)
    }

    /// Sends an event to one connection only. Unknown or full connections are
    /// skipped.
    pub fn notify(&self, id: ConnectionId, event: ServerEvent) {
        if let Some(connection) = self.connections.get(&id) {
            if let Err(e) = connection.outbound.try_send(event) {
                warn!(connection = %id, "failed to queue direct event: {}", e);
            }
        }
    }

    /// Forgets a connection and its room membership. Returns `false` if the
    /// connection was already gone.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(&id) else {
            return false;
        };
        if let Some(room) = connection.room {
            self.leave_room(id, &room);
        }
        info!(connection = %id, "connection removed");
        true
    }

    /// The room a connection is currently in.
    pub fn room_of(&self, id: ConnectionId) -> Result<Option<&RoomKey>> {
        self.connections
            .get(&id)
            .map(|connection| connection.room.as_ref())
            .ok_or(RelayError::UnknownConnection(id))
    }

    pub fn room_size(&self, key: &RoomKey) -> usize {
        self.rooms.get(key).map_or(0, HashSet::len)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn keying(&self) -> RoomKeying {
        self.keying
    }

    /// Drops every connection and room. Outbound receivers see their queue
    /// close, which ends the corresponding writer tasks.
    pub fn shutdown(&mut self) {
        info!(
            connections = self.connections.len(),
            rooms = self.rooms.len(),
            "tearing down registry"
        );
        self.rooms.clear();
        self.connections.clear();
    }

    fn leave_room(&mut self, id: ConnectionId, key: &RoomKey) {
        if let Some(members) = self.rooms.get_mut(key) {
            members.remove(&id);
            if members.is_empty() {
                debug!(room = %key, "room is empty, removing it");
                self.rooms.remove(key);
            }
        }
    }
}
