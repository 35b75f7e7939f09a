//! HTTP surface: static client, health, scoreboard

pub mod middleware;
pub mod routes;

pub use routes::build_router;
