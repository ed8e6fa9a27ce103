//! Snake Arena Server Library
//!
//! A shared toroidal snake arena driven by many independent HTTP clients.
//!
//! # Features
//!
//! - `sqlite` - Durable world store backed by SQLite (enabled by default)

pub mod config;
pub mod util;
pub mod game;
pub mod store;
pub mod net;
pub mod metrics;
