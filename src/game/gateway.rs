//! The room's event loop: applies session commands to the store one at a
//! time and fans the results out

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::ws::protocol::{Collectible, Direction, PlayerId, ServerMsg};

use super::dispatch::{Dispatcher, Outbound};
use super::store::{EntityStore, Standing};

/// Command queue depth shared by all sessions
const COMMAND_CAPACITY: usize = 1024;

/// Work item for the gateway loop
#[derive(Debug)]
pub enum GameCommand {
    /// A connection finished its upgrade and wants a player
    Join { id: PlayerId, outbound: Outbound },
    /// Validated movement request
    Move {
        id: PlayerId,
        direction: Direction,
        speed: i32,
    },
    /// Collection attempt against the live collectible
    Collect { id: PlayerId },
    /// The connection is gone
    Leave { id: PlayerId },
    /// Scoreboard query
    Standings { reply: oneshot::Sender<Vec<Standing>> },
    /// Room summary query
    Status { reply: oneshot::Sender<RoomStatus> },
}

/// Summary for health checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatus {
    pub players: usize,
    pub collectible: Collectible,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Game loop is not running")]
    Closed,
}

/// Cloneable handle used by sessions and HTTP handlers
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<GameCommand>,
    dispatcher: Dispatcher,
}

impl GatewayHandle {
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub async fn send(&self, command: GameCommand) -> Result<(), GatewayError> {
        self.commands.send(command).await.map_err(|_| GatewayError::Closed)
    }

    pub async fn standings(&self) -> Result<Vec<Standing>, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.send(GameCommand::Standings { reply }).await?;
        rx.await.map_err(|_| GatewayError::Closed)
    }

    pub async fn status(&self) -> Result<RoomStatus, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.send(GameCommand::Status { reply }).await?;
        rx.await.map_err(|_| GatewayError::Closed)
    }
}

/// Single owner of the entity store
pub struct Gateway {
    store: EntityStore,
    dispatcher: Dispatcher,
    commands: mpsc::Receiver<GameCommand>,
}

impl Gateway {
    pub fn new(store: EntityStore, dispatcher: Dispatcher) -> (Self, GatewayHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);

        let handle = GatewayHandle {
            commands: tx,
            dispatcher: dispatcher.clone(),
        };
        let gateway = Self {
            store,
            dispatcher,
            commands: rx,
        };

        (gateway, handle)
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self) {
        info!(
            collectible_id = %self.store.collectible().id,
            "Game loop started"
        );

        while let Some(command) = self.commands.recv().await {
            self.handle(command);
        }

        info!("Game loop stopped");
    }

    /// Apply one command to completion
    pub fn handle(&mut self, command: GameCommand) {
        match command {
            GameCommand::Join { id, outbound } => self.handle_join(id, outbound),
            GameCommand::Move {
                id,
                direction,
                speed,
            } => self.handle_move(id, direction, speed),
            GameCommand::Collect { id } => self.handle_collect(id),
            GameCommand::Leave { id } => self.handle_leave(id),
            GameCommand::Standings { reply } => {
                let _ = reply.send(self.store.standings());
            }
            GameCommand::Status { reply } => {
                let _ = reply.send(RoomStatus {
                    players: self.store.player_count(),
                    collectible: self.store.collectible().clone(),
                });
            }
        }
    }

    fn handle_join(&mut self, id: PlayerId, outbound: Outbound) {
        if self.dispatcher.is_registered(&id) {
            warn!(player_id = %id, "Join for an already active id, replacing session");
        }

        let player = self.store.add_player(id);
        self.dispatcher.register(id, outbound);

        self.dispatcher
            .send_to(&id, ServerMsg::Init(self.store.snapshot(id)));
        self.dispatcher
            .send_to_all_except(&id, &ServerMsg::NewPlayer(player.clone()));

        info!(
            player_id = %id,
            x = player.x,
            y = player.y,
            player_count = self.store.player_count(),
            "Player joined"
        );
    }

    fn handle_move(&mut self, id: PlayerId, direction: Direction, speed: i32) {
        match self.store.move_player(&id, direction, speed) {
            Some(player) => {
                self.dispatcher.send_to_all(&ServerMsg::UpdatePlayer(player));
            }
            None => debug!(player_id = %id, "Move for unknown player ignored"),
        }
    }

    fn handle_collect(&mut self, id: PlayerId) {
        let Some(collection) = self.store.try_collect(&id) else {
            debug!(player_id = %id, "Collect attempt missed");
            return;
        };

        info!(
            player_id = %id,
            score = collection.player.score,
            next_collectible = %collection.collectible.id,
            "Collectible taken"
        );

        self.dispatcher
            .send_to_all(&ServerMsg::UpdateCollectible(collection.collectible));
        self.dispatcher
            .send_to_all(&ServerMsg::UpdatePlayer(collection.player));
    }

    fn handle_leave(&mut self, id: PlayerId) {
        self.dispatcher.unregister(&id);

        if self.store.remove_player(&id) {
            self.dispatcher.send_to_all(&ServerMsg::RemovePlayer(id));
            info!(
                player_id = %id,
                player_count = self.store.player_count(),
                "Player left"
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }
}
