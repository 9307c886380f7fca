//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::sessions::{SessionStore, StoreError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use gridguess_core::{
    hint_or_fallback, Catalog, HintProvider, HintRequest, NameMatcher, DEFAULT_AUTOCOMPLETE_LIMIT,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// Playable countries, read-only after startup
    pub catalog: Arc<Catalog>,
    /// All live games
    pub sessions: SessionStore,
    /// Hint source, called outside any session guard
    pub hints: Arc<dyn HintProvider>,
    /// Mapping from connection ID to its current session ID
    pub connection_sessions: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to its message sender
    pub connection_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(catalog: Arc<Catalog>, sessions: SessionStore, hints: Arc<dyn HintProvider>) -> Self {
        Self {
            catalog,
            sessions,
            hints,
            connection_sessions: DashMap::new(),
            connection_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.connection_senders.get(&connection_id) {
            let _ = sender.send(msg);
        }
    }

    /// The session currently attached to a connection
    pub fn session_of(&self, connection_id: Uuid) -> Option<Uuid> {
        self.connection_sessions.get(&connection_id).map(|s| *s)
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Gridguess server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Periodically discard idle sessions.
pub async fn sweep_sessions(state: Arc<ServerState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let removed = state.sessions.sweep_expired(Instant::now());
        if removed > 0 {
            info!(
                "Expired {} idle sessions, {} remain",
                removed,
                state.sessions.len()
            );
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.connection_senders.insert(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(connection_id, client_msg, &state).await,
                Err(e) => {
                    warn!("Invalid message from {}: {}", connection_id, e);
                    state.send_to(
                        connection_id,
                        ServerMessage::Error {
                            message: "Invalid message".to_string(),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to(connection_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    // Sessions outlive the connection so the player can resume until they expire
    state.connection_sessions.remove(&connection_id);
    state.connection_senders.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

/// Handle a client message.
async fn handle_message(connection_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::StartSession => {
            // Abandon any previous game on this connection
            if let Some(previous) = state.session_of(connection_id) {
                state.sessions.remove(previous);
            }

            let started = state
                .sessions
                .start(&state.catalog, &mut rand::thread_rng());
            match started {
                Ok((session_id, start)) => {
                    state.connection_sessions.insert(connection_id, session_id);
                    info!("Connection {} started session {}", connection_id, session_id);
                    state.send_to(
                        connection_id,
                        ServerMessage::SessionStarted {
                            session_id,
                            energy_mix: start.energy_mix,
                            attempts_left: start.attempts_left,
                            max_attempts: start.max_attempts,
                        },
                    );
                }
                Err(e) => {
                    error!("Failed to start session: {}", e);
                    state.send_to(
                        connection_id,
                        ServerMessage::Error {
                            message: "Could not start a game".to_string(),
                        },
                    );
                }
            }
        }

        ClientMessage::ResumeSession { session_id } => match state.sessions.resume(session_id) {
            Ok(resumed) => {
                state.connection_sessions.insert(connection_id, session_id);
                state.send_to(
                    connection_id,
                    ServerMessage::SessionResumed {
                        session_id,
                        energy_mix: resumed.start.energy_mix,
                        attempts_left: resumed.start.attempts_left,
                        max_attempts: resumed.start.max_attempts,
                        guesses: resumed.guesses,
                    },
                );
            }
            Err(e) => {
                state.send_to(
                    connection_id,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        },

        ClientMessage::Guess { guess } => {
            let outcome = match state.session_of(connection_id) {
                Some(session_id) => {
                    let outcome = state.sessions.guess(session_id, &state.catalog, &guess);
                    debug!(
                        "Session {} guessed {:?}: {:?}",
                        session_id, outcome.guess, outcome.status
                    );
                    if outcome.terminal {
                        state.connection_sessions.remove(&connection_id);
                    }
                    outcome
                }
                None => gridguess_core::GuessOutcome::session_not_started(&guess),
            };
            state.send_to(connection_id, ServerMessage::GuessResult { outcome });
        }

        ClientMessage::Autocomplete { prefix } => {
            let names = NameMatcher::new(&state.catalog)
                .autocomplete(&prefix, DEFAULT_AUTOCOMPLETE_LIMIT)
                .into_iter()
                .map(str::to_string)
                .collect();
            state.send_to(connection_id, ServerMessage::Suggestions { names });
        }

        ClientMessage::Hint { prompt } => {
            let target = state
                .session_of(connection_id)
                .ok_or(StoreError::SessionNotFound)
                .and_then(|session_id| state.sessions.target(session_id));

            let message = match target {
                Ok(target) => {
                    let hints = Arc::clone(&state.hints);
                    let text = tokio::task::spawn_blocking(move || {
                        let request = HintRequest {
                            prompt: &prompt,
                            target: &target,
                        };
                        hint_or_fallback(hints.as_ref(), &request)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        error!("Hint task failed: {}", e);
                        gridguess_core::hint::FALLBACK_HINT.to_string()
                    });
                    ServerMessage::Hint { text }
                }
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            };
            state.send_to(connection_id, message);
        }

        ClientMessage::ListCountries => {
            let names = state
                .catalog
                .all_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            state.send_to(connection_id, ServerMessage::Countries { names });
        }

        ClientMessage::Ping => {
            state.send_to(connection_id, ServerMessage::Pong);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridguess_core::{CoordinateRow, EnergyMixHints, EnergyRow, RejectionCode};

    fn state() -> Arc<ServerState> {
        let places = [("France", 46.6, 2.2), ("Germany", 51.2, 10.5)];
        let energy: Vec<_> = places
            .iter()
            .map(|(n, _, _)| EnergyRow {
                country: n.to_string(),
                year: 2020,
                electricity_generation: Some(500.0),
                nuclear_electricity: Some(335.0),
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
        let catalog = Catalog::build(&energy, &coords, 2020).unwrap();
        Arc::new(ServerState::new(
            Arc::new(catalog),
            SessionStore::new(5, Duration::from_secs(60)),
            Arc::new(EnergyMixHints),
        ))
    }

    fn connect(state: &ServerState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connection_senders.insert(connection_id, tx);
        (connection_id, rx)
    }

    #[tokio::test]
    async fn test_guess_before_start() {
        let state = state();
        let (conn, mut rx) = connect(&state);

        handle_message(conn, ClientMessage::Guess { guess: "France".into() }, &state).await;
        match rx.recv().await.unwrap() {
            ServerMessage::GuessResult { outcome } => {
                assert_eq!(outcome.rejection(), Some(RejectionCode::SessionNotStarted));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_then_win() {
        let state = state();
        let (conn, mut rx) = connect(&state);

        handle_message(conn, ClientMessage::StartSession, &state).await;
        let session_id = match rx.recv().await.unwrap() {
            ServerMessage::SessionStarted {
                session_id,
                attempts_left,
                ..
            } => {
                assert_eq!(attempts_left, 5);
                session_id
            }
            other => panic!("unexpected {other:?}"),
        };
        let target = state.sessions.target(session_id).unwrap().name.clone();

        handle_message(conn, ClientMessage::Hint { prompt: String::new() }, &state).await;
        match rx.recv().await.unwrap() {
            ServerMessage::Hint { text } => assert!(!text.contains(&target)),
            other => panic!("unexpected {other:?}"),
        }

        handle_message(conn, ClientMessage::Guess { guess: target.to_lowercase() }, &state).await;
        match rx.recv().await.unwrap() {
            ServerMessage::GuessResult { outcome } => {
                assert!(outcome.terminal);
                assert_eq!(outcome.revealed_target.as_deref(), Some(target.as_str()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(state.session_of(conn).is_none());
        assert!(!state.sessions.contains(session_id));
    }

    #[tokio::test]
    async fn test_players_do_not_share_games() {
        let state = state();
        let (alice, mut alice_rx) = connect(&state);
        let (bob, mut bob_rx) = connect(&state);

        handle_message(alice, ClientMessage::StartSession, &state).await;
        handle_message(bob, ClientMessage::StartSession, &state).await;
        let _ = alice_rx.recv().await;
        let _ = bob_rx.recv().await;

        assert_ne!(state.session_of(alice), state.session_of(bob));
        assert_eq!(state.sessions.len(), 2);

        // Restarting replaces only Alice's game
        handle_message(alice, ClientMessage::StartSession, &state).await;
        let _ = alice_rx.recv().await;
        assert_eq!(state.sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_autocomplete_and_countries() {
        let state = state();
        let (conn, mut rx) = connect(&state);

        handle_message(conn, ClientMessage::Autocomplete { prefix: "ge".into() }, &state).await;
        match rx.recv().await.unwrap() {
            ServerMessage::Suggestions { names } => assert_eq!(names, vec!["Germany"]),
            other => panic!("unexpected {other:?}"),
        }

        handle_message(conn, ClientMessage::ListCountries, &state).await;
        match rx.recv().await.unwrap() {
            ServerMessage::Countries { names } => assert_eq!(names, vec!["France", "Germany"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resume_after_reconnect() {
        let state = state();
        let (first, mut first_rx) = connect(&state);
        handle_message(first, ClientMessage::StartSession, &state).await;
        let session_id = match first_rx.recv().await.unwrap() {
            ServerMessage::SessionStarted { session_id, .. } => session_id,
            other => panic!("unexpected {other:?}"),
        };

        let (second, mut second_rx) = connect(&state);
        handle_message(second, ClientMessage::ResumeSession { session_id }, &state).await;
        match second_rx.recv().await.unwrap() {
            ServerMessage::SessionResumed { guesses, attempts_left, .. } => {
                assert!(guesses.is_empty());
                assert_eq!(attempts_left, 5);
            }
            other => panic!("unexpected {other:?}"),
        }

        handle_message(
            second,
            ClientMessage::ResumeSession {
                session_id: Uuid::new_v4(),
            },
            &state,
        )
        .await;
        assert!(matches!(
            second_rx.recv().await.unwrap(),
            ServerMessage::Error { .. }
        ));
    }
}
