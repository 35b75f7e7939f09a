//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection-scoped player identifier
pub type PlayerId = Uuid;

/// Authoritative player state, sent whole on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub score: u32,
}

/// The single live collectible
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collectible {
    /// Generation token, invalid once the collectible is replaced
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// Points awarded on collection (1-3)
    pub value: u32,
}

/// Full room state handed to a newly joined connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The receiving connection's own player id
    pub id: PlayerId,
    pub players: HashMap<PlayerId, Player>,
    pub collectible: Collectible,
}

/// Movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Request to move one step along an axis
    MovePlayer {
        direction: Direction,
        /// Step length in arena units
        speed: f64,
    },

    /// Ask the server to check the player against the live collectible
    CollectItem,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Full state, sent once to the joining connection
    Init(Snapshot),

    /// Another player joined
    NewPlayer(Player),

    /// Full replacement of one player's state
    UpdatePlayer(Player),

    /// Full replacement of the collectible
    UpdateCollectible(Collectible),

    /// A player disconnected
    RemovePlayer(PlayerId),
}

impl ServerMsg {
    /// Event name as it appears on the wire
    pub fn event(&self) -> &'static str {
        match self {
            ServerMsg::Init(_) => "init",
            ServerMsg::NewPlayer(_) => "new-player",
            ServerMsg::UpdatePlayer(_) => "update-player",
            ServerMsg::UpdateCollectible(_) => "update-collectible",
            ServerMsg::RemovePlayer(_) => "remove-player",
        }
    }
}

/// Rejected client input. Never reported back to the client.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Speed {0} is not a positive number")]
    InvalidSpeed(f64),

    #[error("Rate limited")]
    RateLimited,
}

/// Parse a text frame into a client message
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, InputError> {
    Ok(serde_json::from_str(text)?)
}

/// Turn a claimed speed into a whole-unit step in `1..=max_step`.
/// Oversized steps saturate; the arena clamp does the actual bounding.
pub fn validate_speed(speed: f64, max_step: i32) -> Result<i32, InputError> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(InputError::InvalidSpeed(speed));
    }
    Ok(speed.round().clamp(1.0, max_step as f64) as i32)
}
