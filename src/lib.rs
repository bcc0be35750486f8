pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod domain;
pub mod engines;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod registry;
pub mod repository;
pub mod server;
pub mod service;
pub mod slug;
pub mod types;
