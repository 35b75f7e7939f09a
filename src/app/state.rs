//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{CollectibleGenerator, Dispatcher, EntityStore, Gateway, GatewayHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: GatewayHandle,
}

impl AppState {
    /// Build the room. The returned gateway must be spawned for the room to
    /// make progress.
    pub fn new(config: Config) -> (Self, Gateway) {
        let config = Arc::new(config);

        let generator = match config.game_seed {
            Some(seed) => CollectibleGenerator::seeded(config.arena, seed),
            None => CollectibleGenerator::from_entropy(config.arena),
        };
        let store = EntityStore::new(generator);

        let (gateway, handle) = Gateway::new(store, Dispatcher::new());

        let state = Self {
            config,
            gateway: handle,
        };
        (state, gateway)
    }
}
