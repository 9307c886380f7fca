//! Per-player game session state machine.
//!
//! A session moves `NotStarted -> InProgress -> {Won, Lost}`. Finished
//! sessions stay finished; a new game is a new `GameSession`.

use crate::catalog::{Catalog, CatalogEntry};
use crate::matcher::NameMatcher;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Attempts a player gets unless configured otherwise
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl SessionStatus {
    /// Whether no further guesses are accepted
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Won | SessionStatus::Lost)
    }
}

/// Reasons a session operation was refused.
///
/// None of these change the session.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SessionError {
    #[error("max attempts must be positive")]
    InvalidMaxAttempts,

    #[error("Game not started")]
    SessionNotStarted,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Game is over")]
    SessionOver,

    #[error("'{0}' was already guessed")]
    DuplicateGuess(String),

    #[error("'{0}' is not a playable country")]
    UnknownCountry(String),
}

/// A guess the session accepted and counted
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedGuess {
    /// The catalog entry the guess resolved to
    pub entry: Arc<CatalogEntry>,
    /// Status after the guess was applied
    pub status: SessionStatus,
}

/// One player's game
#[derive(Debug, Clone)]
pub struct GameSession {
    target: Option<Arc<CatalogEntry>>,
    /// Submitted guesses in order, as typed (trimmed)
    guess_history: Vec<String>,
    attempts_used: u32,
    max_attempts: u32,
    status: SessionStatus,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            target: None,
            guess_history: Vec::new(),
            attempts_used: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: SessionStatus::NotStarted,
        }
    }
}

impl GameSession {
    /// Create an unstarted session with the given attempt budget
    pub fn new(max_attempts: u32) -> Result<Self, SessionError> {
        if max_attempts == 0 {
            return Err(SessionError::InvalidMaxAttempts);
        }
        Ok(Self {
            max_attempts,
            ..Self::default()
        })
    }

    /// Start the game with a target drawn uniformly from the catalog
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<&Arc<CatalogEntry>, SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        let target = Arc::clone(catalog.random_entry(rng));
        self.start_with_target(target)
    }

    /// Start the game with a chosen target
    pub fn start_with_target(
        &mut self,
        target: Arc<CatalogEntry>,
    ) -> Result<&Arc<CatalogEntry>, SessionError> {
        if self.status != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.guess_history.clear();
        self.attempts_used = 0;
        self.status = SessionStatus::InProgress;
        Ok(self.target.insert(target))
    }

    /// Submit a guess.
    ///
    /// Duplicates (ignoring case) and names that do not resolve are refused
    /// without consuming an attempt. Accepted guesses are recorded, counted,
    /// and may end the game.
    pub fn submit_guess(
        &mut self,
        catalog: &Catalog,
        name: &str,
    ) -> Result<AcceptedGuess, SessionError> {
        match self.status {
            SessionStatus::NotStarted => return Err(SessionError::SessionNotStarted),
            SessionStatus::Won | SessionStatus::Lost => return Err(SessionError::SessionOver),
            SessionStatus::InProgress => {}
        }
        let target = self.target.clone().ok_or(SessionError::SessionNotStarted)?;

        let name = name.trim();
        if self.has_guessed(name) {
            return Err(SessionError::DuplicateGuess(name.to_string()));
        }

        let entry = NameMatcher::new(catalog)
            .resolve_exact(name)
            .map_err(|_| SessionError::UnknownCountry(name.to_string()))?;
        let entry = Arc::clone(entry);

        self.guess_history.push(name.to_string());
        self.attempts_used += 1;

        // Resolution already ignored case; the entry name is canonical
        if entry.name == target.name {
            self.status = SessionStatus::Won;
        } else if self.attempts_used >= self.max_attempts {
            self.status = SessionStatus::Lost;
        }

        Ok(AcceptedGuess {
            entry,
            status: self.status,
        })
    }

    /// Whether `name` was already guessed, ignoring case
    pub fn has_guessed(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.guess_history
            .iter()
            .any(|previous| previous.to_lowercase() == name)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn target(&self) -> Option<&Arc<CatalogEntry>> {
        self.target.as_ref()
    }

    pub fn guess_history(&self) -> &[String] {
        &self.guess_history
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts_left(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_used)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CoordinateRow, EnergyRow};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let places = [
            ("Chile", -35.7, -71.5),
            ("France", 46.6, 2.2),
            ("Germany", 51.2, 10.5),
            ("Japan", 36.2, 138.3),
            ("Kenya", -0.02, 37.9),
            ("Peru", -9.2, -75.0),
        ];
        let energy: Vec<_> = places
            .iter()
            .map(|(n, _, _)| EnergyRow {
                country: n.to_string(),
                year: 2020,
                electricity_generation: Some(100.0),
                ..Default::default()
            })
            .collect();
        let coords: Vec<_> = places
            .iter()
            .map(|(n, lat, lon)| CoordinateRow {
                country: n.to_string(),
                latitude: Some(*lat),
                longitude: Some(*lon),
            })
            .collect();
        Catalog::build(&energy, &coords, 2020).unwrap()
    }

    fn started(catalog: &Catalog, target: &str, max_attempts: u32) -> GameSession {
        let mut session = GameSession::new(max_attempts).unwrap();
        session
            .start_with_target(catalog.lookup(target).unwrap().clone())
            .unwrap();
        session
    }

    #[test]
    fn test_new_session_is_not_started() {
        let session = GameSession::new(5).unwrap();
        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert!(session.target().is_none());
        assert_eq!(session.attempts_left(), 5);
        assert_eq!(GameSession::new(0).unwrap_err(), SessionError::InvalidMaxAttempts);
    }

    #[test]
    fn test_start_picks_target() {
        let catalog = catalog();
        let mut session = GameSession::default();
        let mut rng = StdRng::seed_from_u64(42);
        let target = session.start(&catalog, &mut rng).unwrap().name.clone();

        assert!(catalog.lookup(&target).is_some());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.attempts_used(), 0);
        assert!(session.guess_history().is_empty());

        assert_eq!(
            session.start(&catalog, &mut rng).unwrap_err(),
            SessionError::AlreadyStarted
        );
    }

    #[test]
    fn test_guess_before_start() {
        let catalog = catalog();
        let mut session = GameSession::default();
        assert_eq!(
            session.submit_guess(&catalog, "France").unwrap_err(),
            SessionError::SessionNotStarted
        );
        assert_eq!(session.attempts_used(), 0);
    }

    #[test]
    fn test_duplicate_guess_is_free() {
        let catalog = catalog();
        let mut session = started(&catalog, "France", 5);

        session.submit_guess(&catalog, "Germany").unwrap();
        assert_eq!(session.attempts_used(), 1);

        for again in ["Germany", "germany", "  GERMANY "] {
            assert_eq!(
                session.submit_guess(&catalog, again).unwrap_err(),
                SessionError::DuplicateGuess(again.trim().to_string())
            );
        }
        assert_eq!(session.attempts_used(), 1);
        assert_eq!(session.guess_history(), ["Germany"]);
    }

    #[test]
    fn test_unknown_country_is_free() {
        let catalog = catalog();
        let mut session = started(&catalog, "France", 5);

        assert_eq!(
            session.submit_guess(&catalog, "Atlantis").unwrap_err(),
            SessionError::UnknownCountry("Atlantis".into())
        );
        assert_eq!(session.attempts_used(), 0);
        assert!(session.guess_history().is_empty());
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[test]
    fn test_win_on_last_attempt() {
        let catalog = catalog();
        let mut session = started(&catalog, "France", 3);

        session.submit_guess(&catalog, "Chile").unwrap();
        session.submit_guess(&catalog, "Peru").unwrap();
        let accepted = session.submit_guess(&catalog, "france").unwrap();

        assert_eq!(accepted.status, SessionStatus::Won);
        assert_eq!(accepted.entry.name, "France");
        assert_eq!(session.status(), SessionStatus::Won);
        assert_eq!(session.attempts_left(), 0);
    }

    #[test]
    fn test_lose_after_max_attempts() {
        let catalog = catalog();
        let mut session = started(&catalog, "France", 5);

        for (i, guess) in ["Chile", "Germany", "Japan", "Kenya"].iter().enumerate() {
            let accepted = session.submit_guess(&catalog, guess).unwrap();
            assert_eq!(accepted.status, SessionStatus::InProgress);
            assert_eq!(session.attempts_used(), i as u32 + 1);
        }
        let last = session.submit_guess(&catalog, "Peru").unwrap();
        assert_eq!(last.status, SessionStatus::Lost);
        assert!(session.is_terminal());
    }

    #[test]
    fn test_finished_session_refuses_guesses() {
        let catalog = catalog();
        let mut session = started(&catalog, "Japan", 5);
        session.submit_guess(&catalog, "Japan").unwrap();

        assert_eq!(
            session.submit_guess(&catalog, "Chile").unwrap_err(),
            SessionError::SessionOver
        );
        assert_eq!(session.attempts_used(), 1);
        assert_eq!(session.status(), SessionStatus::Won);
    }
}
