//! Shared-room game state and its event loop

pub mod collectible;
pub mod collision;
pub mod dispatch;
pub mod gateway;
pub mod store;

pub use collectible::CollectibleGenerator;
pub use dispatch::Dispatcher;
pub use gateway::{Gateway, GatewayHandle};
pub use store::EntityStore;
