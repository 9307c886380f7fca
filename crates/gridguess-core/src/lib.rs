//! Gridguess - guess the country from its electricity mix
//!
//! This crate provides the core game logic for Gridguess, including:
//! - The catalog of playable countries and their energy data
//! - Great-circle distance and compass bearings between countries
//! - Exact, prefix and fuzzy country-name matching
//! - The per-player session state machine and guess evaluation
//!
//! # Architecture
//!
//! The engine is synchronous and does no I/O. A data loader supplies raw
//! rows to [`Catalog::build`]; a transport owns one [`GameSession`] per
//! player and calls [`evaluate`] for each guess.
//!
//! # Modules
//!
//! - [`catalog`]: Validated country records
//! - [`geo`]: Haversine distance, bearings and the compass rose
//! - [`matcher`]: Name resolution, autocomplete and suggestions
//! - [`session`]: Session lifecycle
//! - [`evaluate`]: Guess feedback
//! - [`hint`]: Hint providers

pub mod catalog;
pub mod evaluate;
pub mod geo;
pub mod hint;
pub mod matcher;
pub mod session;

// Re-export commonly used types
pub use catalog::{
    Catalog, CatalogEntry, CatalogError, CoordinateRow, EnergyMix, EnergyRow, EnergySource,
    DEFAULT_REFERENCE_YEAR,
};
pub use evaluate::{
    evaluate, start_outcome, Direction, GuessOutcome, OutcomeStatus, RejectionCode, SessionStart,
};
pub use geo::{distance_km, initial_bearing_degrees, Cardinal, CoordinateError, Coordinates};
pub use hint::{hint_or_fallback, EnergyMixHints, HintError, HintProvider, HintRequest};
pub use matcher::{fuzzy_best_match, MatchError, NameMatcher, DEFAULT_AUTOCOMPLETE_LIMIT};
pub use session::{AcceptedGuess, GameSession, SessionError, SessionStatus, DEFAULT_MAX_ATTEMPTS};
