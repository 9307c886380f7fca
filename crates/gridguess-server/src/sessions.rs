//! Per-player game session storage.
//!
//! Every player gets their own [`GameSession`] keyed by an opaque id. The
//! map's per-entry write guard serialises guesses within one session, while
//! different sessions proceed independently.

use dashmap::DashMap;
use gridguess_core::{
    evaluate, start_outcome, Catalog, CatalogEntry, GameSession, GuessOutcome, SessionError,
    SessionStart,
};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found")]
    SessionNotFound,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A game plus the bookkeeping needed to expire it.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub id: Uuid,
    pub game: GameSession,
    pub last_active: Instant,
}

impl PlayerSession {
    pub fn new(id: Uuid, game: GameSession) -> Self {
        Self {
            id,
            game,
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// Snapshot returned when reattaching to a session
#[derive(Debug, Clone)]
pub struct ResumedSession {
    pub start: SessionStart,
    pub guesses: Vec<String>,
}

/// All live sessions
pub struct SessionStore {
    sessions: DashMap<Uuid, PlayerSession>,
    max_attempts: u32,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(max_attempts: u32, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_attempts,
            ttl,
        }
    }

    /// Start a new game with a random target and return its id
    pub fn start<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<(Uuid, SessionStart), StoreError> {
        let mut game = GameSession::new(self.max_attempts)?;
        game.start(catalog, rng)?;
        self.insert(game)
    }

    /// Store an already-started game
    pub fn insert(&self, game: GameSession) -> Result<(Uuid, SessionStart), StoreError> {
        let start = start_outcome(&game)?;
        let id = Uuid::new_v4();
        self.sessions.insert(id, PlayerSession::new(id, game));
        Ok((id, start))
    }

    /// Evaluate a guess for one session.
    ///
    /// Finished sessions are dropped once their terminal outcome is produced.
    pub fn guess(&self, id: Uuid, catalog: &Catalog, raw_input: &str) -> GuessOutcome {
        let outcome = {
            let Some(mut session) = self.sessions.get_mut(&id) else {
                return GuessOutcome::session_not_started(raw_input);
            };
            session.touch();
            evaluate(&mut session.game, catalog, raw_input)
        };

        if outcome.terminal {
            self.sessions.remove(&id);
        }
        outcome
    }

    /// The hidden target for a session, for hint generation
    pub fn target(&self, id: Uuid) -> Result<Arc<CatalogEntry>, StoreError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(StoreError::SessionNotFound)?;
        session.touch();
        session
            .game
            .target()
            .cloned()
            .ok_or(StoreError::Session(SessionError::SessionNotStarted))
    }

    /// Snapshot of a session for a reconnecting player
    pub fn resume(&self, id: Uuid) -> Result<ResumedSession, StoreError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or(StoreError::SessionNotFound)?;
        session.touch();
        Ok(ResumedSession {
            start: start_outcome(&session.game)?,
            guesses: session.game.guess_history().to_vec(),
        })
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than the TTL, returning how many
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.last_active) <= self.ttl);
        before.saturating_sub(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridguess_core::{CoordinateRow, EnergyRow, RejectionCode};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let places = [("Chile", -35.7, -71.5), ("Japan", 36.2, 138.3)];
        let energy: Vec<_> = places
            .iter()
            .map(|(n, _, _)| EnergyRow {
                country: n.to_string(),
                year: 2020,
                electricity_generation: Some(80.0),
                hydro_electricity: Some(20.0),
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

    fn store() -> SessionStore {
        SessionStore::new(3, Duration::from_secs(60))
    }

    #[test]
    fn test_start_creates_distinct_sessions() {
        let catalog = catalog();
        let store = store();
        let mut rng = StdRng::seed_from_u64(1);

        let (a, start) = store.start(&catalog, &mut rng).unwrap();
        let (b, _) = store.start(&catalog, &mut rng).unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(start.max_attempts, 3);
        assert_eq!(start.attempts_left, 3);
    }

    #[test]
    fn test_guess_without_session() {
        let catalog = catalog();
        let store = store();
        let outcome = store.guess(Uuid::new_v4(), &catalog, "Chile");
        assert_eq!(outcome.rejection(), Some(RejectionCode::SessionNotStarted));
    }

    #[test]
    fn test_finished_session_is_removed() {
        let catalog = catalog();
        let store = store();
        let mut rng = StdRng::seed_from_u64(9);
        let (id, _) = store.start(&catalog, &mut rng).unwrap();
        let target = store.target(id).unwrap().name.clone();

        let outcome = store.guess(id, &catalog, &target);
        assert!(outcome.terminal);
        assert!(!store.contains(id));

        let after = store.guess(id, &catalog, &target);
        assert_eq!(after.rejection(), Some(RejectionCode::SessionNotStarted));
    }

    #[test]
    fn test_rejections_keep_session() {
        let catalog = catalog();
        let store = store();
        let mut rng = StdRng::seed_from_u64(3);
        let (id, _) = store.start(&catalog, &mut rng).unwrap();

        let outcome = store.guess(id, &catalog, "Narnia");
        assert_eq!(outcome.rejection(), Some(RejectionCode::UnknownCountry));
        assert!(store.contains(id));

        let resumed = store.resume(id).unwrap();
        assert!(resumed.guesses.is_empty());
        assert_eq!(resumed.start.attempts_left, 3);
    }

    #[test]
    fn test_sweep_expired() {
        let catalog = catalog();
        let store = SessionStore::new(3, Duration::from_secs(30));
        let mut rng = StdRng::seed_from_u64(5);
        let (id, _) = store.start(&catalog, &mut rng).unwrap();

        assert_eq!(store.sweep_expired(Instant::now()), 0);
        assert!(store.contains(id));

        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(store.sweep_expired(later), 1);
        assert!(store.is_empty());
        assert!(matches!(store.target(id), Err(StoreError::SessionNotFound)));
    }

    #[test]
    fn test_concurrent_guesses_count_once_each() {
        let catalog = Arc::new(catalog());
        let store = Arc::new(SessionStore::new(100, Duration::from_secs(60)));
        let mut rng = StdRng::seed_from_u64(11);
        let (id, _) = store.start(&catalog, &mut rng).unwrap();
        let target = store.target(id).unwrap().name.clone();
        let other = if target == "Chile" { "Japan" } else { "Chile" };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || store.guess(id, &catalog, other))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| o.is_accepted())
            .count();

        // Exactly one wins the race; the rest are duplicates
        assert_eq!(accepted, 1);
        assert_eq!(store.resume(id).unwrap().start.attempts_left, 99);
    }
}
