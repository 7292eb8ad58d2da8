pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod provider;
pub mod reaper;
pub mod relay;
pub mod store;
