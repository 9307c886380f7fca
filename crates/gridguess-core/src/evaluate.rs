//! Turning one raw guess into player feedback.
//!
//! [`evaluate`] runs the session transition and computes distance and
//! direction from the guessed country toward the target. Every result,
//! including refusals, is a [`GuessOutcome`]; nothing here ends a session
//! except the game rules themselves.

use crate::catalog::{Catalog, EnergyMix};
use crate::geo::{distance_km, initial_bearing_degrees, Cardinal};
use crate::matcher::NameMatcher;
use crate::session::{AcceptedGuess, GameSession, SessionError, SessionStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NOT_STARTED_MESSAGE: &str = "No active game session. Please start a new game.";

/// Direction feedback for an accepted guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// The target lies this way from the guessed country
    Toward(Cardinal),
    /// The guess was the target
    Correct,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Toward(cardinal) => cardinal.label(),
            Direction::Correct => "Correct",
        }
    }
}

/// Why a guess was not counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionCode {
    EmptyGuess,
    DuplicateGuess,
    UnknownCountry,
    SessionNotStarted,
    SessionOver,
    InternalError,
}

/// Whether the guess counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Accepted,
    Rejected(RejectionCode),
}

/// Feedback for a single guess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessOutcome {
    pub status: OutcomeStatus,
    /// The input as submitted, trimmed
    pub guess: String,
    /// Canonical name of the guessed country, when it resolved
    pub resolved_country: Option<String>,
    /// Great-circle distance to the target; 0 on a win
    pub distance_km: Option<f64>,
    /// Initial bearing from the guess toward the target
    pub bearing_degrees: Option<f64>,
    pub direction: Option<Direction>,
    pub attempts_left: u32,
    /// No further guesses will be accepted
    pub terminal: bool,
    /// The target's name, once the game is over
    pub revealed_target: Option<String>,
    /// Closest known name for unrecognised input
    pub suggestion: Option<String>,
    /// Player-facing summary
    pub message: String,
}

impl GuessOutcome {
    fn rejected(guess: &str, code: RejectionCode, attempts_left: u32, message: String) -> Self {
        Self {
            status: OutcomeStatus::Rejected(code),
            guess: guess.to_string(),
            resolved_country: None,
            distance_km: None,
            bearing_degrees: None,
            direction: None,
            attempts_left,
            terminal: false,
            revealed_target: None,
            suggestion: None,
            message,
        }
    }

    /// Outcome for a guess that arrives with no session behind it
    pub fn session_not_started(raw_input: &str) -> Self {
        Self::rejected(
            raw_input.trim(),
            RejectionCode::SessionNotStarted,
            0,
            NOT_STARTED_MESSAGE.to_string(),
        )
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OutcomeStatus::Accepted
    }

    /// The rejection code, if the guess was not counted
    pub fn rejection(&self) -> Option<RejectionCode> {
        match self.status {
            OutcomeStatus::Accepted => None,
            OutcomeStatus::Rejected(code) => Some(code),
        }
    }
}

/// What a player sees when a game starts; never includes the country name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStart {
    pub energy_mix: EnergyMix,
    pub attempts_left: u32,
    pub max_attempts: u32,
}

/// Start payload for a started session
pub fn start_outcome(session: &GameSession) -> Result<SessionStart, SessionError> {
    let target = session.target().ok_or(SessionError::SessionNotStarted)?;
    Ok(SessionStart {
        energy_mix: target.energy_mix.clone(),
        attempts_left: session.attempts_left(),
        max_attempts: session.max_attempts(),
    })
}

#[derive(Debug, Error)]
enum EvaluationError {
    #[error("session in progress without a target")]
    MissingTarget,
}

/// Evaluate one guess against a session.
///
/// The transition is applied to a copy of the session and committed only if
/// the whole evaluation succeeds, so a failed evaluation leaves the attempt
/// budget untouched.
pub fn evaluate(session: &mut GameSession, catalog: &Catalog, raw_input: &str) -> GuessOutcome {
    let guess = raw_input.trim();
    if guess.is_empty() {
        return GuessOutcome::rejected(
            guess,
            RejectionCode::EmptyGuess,
            session.attempts_left(),
            "No guess provided.".to_string(),
        );
    }

    let mut draft = session.clone();
    let accepted = match draft.submit_guess(catalog, guess) {
        Ok(accepted) => accepted,
        Err(err) => return refusal(session, catalog, guess, err),
    };

    match feedback(&draft, guess, &accepted) {
        Ok(outcome) => {
            *session = draft;
            outcome
        }
        Err(_) => GuessOutcome::rejected(
            guess,
            RejectionCode::InternalError,
            session.attempts_left(),
            "An unexpected error occurred.".to_string(),
        ),
    }
}

fn refusal(session: &GameSession, catalog: &Catalog, guess: &str, err: SessionError) -> GuessOutcome {
    let attempts_left = session.attempts_left();
    match err {
        SessionError::DuplicateGuess(_) => GuessOutcome::rejected(
            guess,
            RejectionCode::DuplicateGuess,
            attempts_left,
            "Country already guessed. Please select a new country.".to_string(),
        ),
        SessionError::UnknownCountry(_) => {
            let suggestion = NameMatcher::new(catalog).fuzzy(guess).ok().map(str::to_string);
            let message = match &suggestion {
                Some(name) => format!("Invalid country. Did you mean {name}?"),
                None => "Invalid country. Please select from the suggestions.".to_string(),
            };
            GuessOutcome {
                suggestion,
                ..GuessOutcome::rejected(guess, RejectionCode::UnknownCountry, attempts_left, message)
            }
        }
        SessionError::SessionNotStarted => GuessOutcome::rejected(
            guess,
            RejectionCode::SessionNotStarted,
            attempts_left,
            NOT_STARTED_MESSAGE.to_string(),
        ),
        SessionError::SessionOver => GuessOutcome {
            terminal: true,
            ..GuessOutcome::rejected(
                guess,
                RejectionCode::SessionOver,
                attempts_left,
                "This game is over. Please start a new game.".to_string(),
            )
        },
        SessionError::InvalidMaxAttempts | SessionError::AlreadyStarted => GuessOutcome::rejected(
            guess,
            RejectionCode::InternalError,
            attempts_left,
            "An unexpected error occurred.".to_string(),
        ),
    }
}

fn feedback(
    session: &GameSession,
    guess: &str,
    accepted: &AcceptedGuess,
) -> Result<GuessOutcome, EvaluationError> {
    let target = session.target().ok_or(EvaluationError::MissingTarget)?;
    let attempts_left = session.attempts_left();
    let resolved = accepted.entry.name.clone();

    if accepted.status == SessionStatus::Won {
        return Ok(GuessOutcome {
            status: OutcomeStatus::Accepted,
            guess: guess.to_string(),
            resolved_country: Some(resolved),
            distance_km: Some(0.0),
            bearing_degrees: None,
            direction: Some(Direction::Correct),
            attempts_left,
            terminal: true,
            revealed_target: Some(target.name.clone()),
            suggestion: None,
            message: "Correct! You've guessed the country!".to_string(),
        });
    }

    let from = accepted.entry.coordinates;
    let to = target.coordinates;
    let distance = distance_km(from, to);
    // Two distinct countries can share geocoded coordinates; bearing is undefined there
    let (bearing, direction) = if from == to {
        (None, Direction::Correct)
    } else {
        let bearing = initial_bearing_degrees(from, to);
        (Some(bearing), Direction::Toward(Cardinal::from_bearing(bearing)))
    };

    let lost = accepted.status == SessionStatus::Lost;
    let hint = match direction {
        Direction::Toward(cardinal) => format!(
            "Try looking {}. Distance: {:.0} km.",
            cardinal.description(),
            distance
        ),
        Direction::Correct => "Right spot, wrong country.".to_string(),
    };
    let message = if lost {
        format!("{hint} Out of attempts! The country was {}.", target.name)
    } else {
        hint
    };

    Ok(GuessOutcome {
        status: OutcomeStatus::Accepted,
        guess: guess.to_string(),
        resolved_country: Some(resolved),
        distance_km: Some(distance),
        bearing_degrees: bearing,
        direction: Some(direction),
        attempts_left,
        terminal: lost,
        revealed_target: lost.then(|| target.name.clone()),
        suggestion: None,
        message,
    })
}
