//! Per-connection lifecycle: Connecting -> Active -> Disconnected

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::collision::Arena;
use crate::game::dispatch::Outbound;
use crate::game::gateway::{GameCommand, GatewayError, GatewayHandle};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{parse_client_msg, validate_speed, ClientMsg, InputError, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgraded, no player yet
    Connecting,
    /// Player exists, input is forwarded
    Active,
    /// Terminal; all input is ignored
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Cannot connect a session in state {0:?}")]
    InvalidState(SessionState),
}

/// One client connection's view of the game
pub struct Session {
    id: PlayerId,
    state: SessionState,
    gateway: GatewayHandle,
    arena: Arena,
    rate_limiter: PlayerRateLimiter,
}

impl Session {
    pub fn new(gateway: GatewayHandle, arena: Arena, rate_limiter: PlayerRateLimiter) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connecting,
            gateway,
            arena,
            rate_limiter,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Create the player and start receiving room events on `outbound`
    pub async fn connect(&mut self, outbound: Outbound) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::InvalidState(self.state));
        }

        self.gateway
            .send(GameCommand::Join {
                id: self.id,
                outbound,
            })
            .await?;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Forward one text frame. Bad input is logged and dropped; only a dead
    /// game loop is an error.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            debug!(player_id = %self.id, state = ?self.state, "Input outside active session ignored");
            return Ok(());
        }

        match self.interpret(text) {
            Ok(command) => self.gateway.send(command).await?,
            Err(InputError::RateLimited) => {
                warn!(player_id = %self.id, "Rate limited input message");
            }
            Err(e) => {
                debug!(player_id = %self.id, error = %e, "Dropping malformed input");
            }
        }
        Ok(())
    }

    /// Remove the player. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }

        let was_active = self.state == SessionState::Active;
        self.state = SessionState::Disconnected;

        if was_active {
            if let Err(e) = self.gateway.send(GameCommand::Leave { id: self.id }).await {
                warn!(player_id = %self.id, error = %e, "Could not report disconnect");
            }
        }
        info!(player_id = %self.id, "Session closed");
    }

    fn interpret(&self, text: &str) -> Result<GameCommand, InputError> {
        if !self.rate_limiter.check_input() {
            return Err(InputError::RateLimited);
        }

        let command = match parse_client_msg(text)? {
            ClientMsg::MovePlayer { direction, speed } => GameCommand::Move {
                id: self.id,
                direction,
                speed: validate_speed(speed, self.arena.max_step())?,
            },
            ClientMsg::CollectItem => GameCommand::Collect { id: self.id },
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collectible::CollectibleGenerator;
    use crate::game::dispatch::{Dispatcher, OUTBOUND_CAPACITY};
    use crate::game::gateway::Gateway;
    use crate::game::store::EntityStore;
    use crate::ws::protocol::ServerMsg;
    use tokio::sync::mpsc;
    use tokio_test::assert_ok;

    fn start_room() -> GatewayHandle {
        let store = EntityStore::new(CollectibleGenerator::seeded(Arena::default(), 3));
        let (gateway, handle) = Gateway::new(store, Dispatcher::new());
        tokio::spawn(gateway.run());
        handle
    }

    fn session(handle: &GatewayHandle) -> Session {
        Session::new(handle.clone(), Arena::default(), PlayerRateLimiter::new(1000))
    }

    async fn connected(handle: &GatewayHandle) -> (Session, mpsc::Receiver<ServerMsg>) {
        let mut session = session(handle);
        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        session.connect(tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMsg::Init(_))));
        (session, rx)
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let handle = start_room();
        let mut session = session(&handle);
        assert_eq!(session.state(), SessionState::Connecting);

        let (tx, _rx) = mpsc::channel(OUTBOUND_CAPACITY);
        assert_ok!(session.connect(tx).await);
        assert_eq!(session.state(), SessionState::Active);

        let (tx, _rx2) = mpsc::channel(OUTBOUND_CAPACITY);
        assert!(matches!(
            session.connect(tx).await,
            Err(SessionError::InvalidState(SessionState::Active))
        ));

        session.disconnect().await;
        assert_eq!(session.state(), SessionState::Disconnected);
        session.disconnect().await;
        assert_eq!(handle.status().await.unwrap().players, 0);
    }

    #[tokio::test]
    async fn valid_move_is_broadcast() {
        let handle = start_room();
        let (mut session, mut rx) = connected(&handle).await;

        session
            .handle_text(r#"{"type":"move-player","direction":"down","speed":5}"#)
            .await
            .unwrap();

        match rx.recv().await {
            Some(ServerMsg::UpdatePlayer(p)) => assert_eq!(p.id, session.id()),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_input_is_ignored() {
        let handle = start_room();
        let (mut session, mut rx) = connected(&handle).await;

        for text in [
            "garbage",
            r#"{"type":"move-player","direction":"diagonal","speed":5}"#,
            r#"{"type":"move-player","direction":"up","speed":-5}"#,
            r#"{"type":"move-player","direction":"up","speed":0}"#,
            r#"{"type":"warp"}"#,
        ] {
            session.handle_text(text).await.unwrap();
        }

        // Round-trip through the loop so any stray broadcast would have landed
        handle.status().await.unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn oversized_and_fractional_speeds_still_move() {
        let handle = start_room();
        let (mut session, mut rx) = connected(&handle).await;
        let arena = Arena::default();

        session
            .handle_text(r#"{"type":"move-player","direction":"right","speed":1000}"#)
            .await
            .unwrap();
        match rx.recv().await {
            Some(ServerMsg::UpdatePlayer(p)) => assert_eq!(p.x, arena.max_x()),
            other => panic!("unexpected message: {:?}", other),
        }

        session
            .handle_text(r#"{"type":"move-player","direction":"left","speed":0.5}"#)
            .await
            .unwrap();
        match rx.recv().await {
            Some(ServerMsg::UpdatePlayer(p)) => assert_eq!(p.x, arena.max_x() - 1),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn input_after_disconnect_is_ignored() {
        let handle = start_room();
        let (mut watcher, mut watcher_rx) = connected(&handle).await;
        let (mut session, _rx) = connected(&handle).await;
        assert!(matches!(watcher_rx.recv().await, Some(ServerMsg::NewPlayer(_))));

        session.disconnect().await;
        assert_eq!(
            watcher_rx.recv().await,
            Some(ServerMsg::RemovePlayer(session.id()))
        );

        session
            .handle_text(r#"{"type":"move-player","direction":"up","speed":5}"#)
            .await
            .unwrap();
        session.handle_text(r#"{"type":"collect-item"}"#).await.unwrap();

        handle.status().await.unwrap();
        assert!(watcher_rx.try_recv().is_err());
        watcher.disconnect().await;
    }

    #[tokio::test]
    async fn rate_limited_input_is_dropped() {
        let handle = start_room();
        let mut session = Session::new(handle.clone(), Arena::default(), PlayerRateLimiter::new(1));
        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        session.connect(tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMsg::Init(_))));

        let step = r#"{"type":"move-player","direction":"left","speed":1}"#;
        session.handle_text(step).await.unwrap();
        session.handle_text(step).await.unwrap();

        handle.status().await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(ServerMsg::UpdatePlayer(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_before_connect_sends_nothing() {
        let handle = start_room();
        let mut session = session(&handle);
        session.disconnect().await;
        assert_eq!(session.state(), SessionState::Disconnected);

        let (tx, _rx) = mpsc::channel(OUTBOUND_CAPACITY);
        assert!(session.connect(tx).await.is_err());
    }
}
