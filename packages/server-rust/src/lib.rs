//! Key-value server: storage engines, the queue/worker dispatch engine, and
//! the HTTP transport in front of it.

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod server;
pub mod service;
pub mod storage;

pub use client::KvClient;
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::KvServer;
pub use service::{DispatchEngine, Dispatcher, ServiceConfig};
pub use storage::{create_storage, StorageConfig, StorageEngine};
