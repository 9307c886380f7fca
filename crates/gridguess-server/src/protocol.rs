//! WebSocket protocol messages for Gridguess.

use gridguess_core::{EnergyMix, GuessOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Start a new game, abandoning any current one
    StartSession,

    /// Reattach to a game started on an earlier connection
    ResumeSession { session_id: Uuid },

    /// Guess a country
    Guess { guess: String },

    /// Country names starting with a prefix
    Autocomplete { prefix: String },

    /// Ask for a hint about the current target
    Hint {
        #[serde(default)]
        prompt: String,
    },

    /// Every playable country
    ListCountries,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with the connection ID
    Welcome { connection_id: Uuid },

    /// A new game began; the target's name is withheld
    SessionStarted {
        session_id: Uuid,
        energy_mix: EnergyMix,
        attempts_left: u32,
        max_attempts: u32,
    },

    /// Reattached to an existing game
    SessionResumed {
        session_id: Uuid,
        energy_mix: EnergyMix,
        attempts_left: u32,
        max_attempts: u32,
        guesses: Vec<String>,
    },

    /// Feedback for a guess
    GuessResult { outcome: GuessOutcome },

    /// Autocomplete results
    Suggestions { names: Vec<String> },

    /// Hint text
    Hint { text: String },

    /// All playable countries
    Countries { names: Vec<String> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}
