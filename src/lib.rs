#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(clippy::too_many_arguments, clippy::type_complexity)]

pub mod auth;
pub mod broadcast;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod distributed;
pub mod error;
pub mod hub;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod rate_limit;
pub mod reconnection;
pub mod registry;
pub mod retry;
pub mod rules;
pub mod rwlock_map;
pub mod server;
pub mod store;
pub mod view_filter;
pub mod websocket;
pub mod worker_pool;

pub use error::{FabricError, FabricResult};
pub use server::{GameFabricServer, ServerConfig};
