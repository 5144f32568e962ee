pub mod bridge;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod limiter;
pub mod server;
