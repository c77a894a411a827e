//! # Drift Core Library
//!
//! This library provides the core logic for Drift, a personal tracker that
//! weighs "doom" (distracting) minutes against "good" (constructive) minutes
//! and pays out coins for the good ones. All operations are available through
//! the standalone `drift-cli` binary; any GUI is a thin layer over the same
//! engine.
//!
//! ## Architecture
//!
//! - **Engine**: a single owned state record mutated only through
//!   [`DriftEngine`] operations, each of which commits by notifying observers
//!   and persisting the whole snapshot
//! - **Storage**: SQLite-backed key-value snapshot store and TOML-based
//!   configuration
//! - **Simulation**: synthetic 30-day history for demos and tests
//!
//! ## Key Components
//!
//! - [`DriftEngine`]: the state engine
//! - [`State`]: the tracked record and its snapshot format
//! - [`KvStore`]: storage seam, implemented by [`SqliteStore`] and [`MemoryStore`]
//! - [`Config`]: application configuration management

pub mod engine;
pub mod error;
pub mod observer;
pub mod simulation;
pub mod state;
pub mod storage;

pub use engine::{DriftEngine, Summary, SNAPSHOT_KEY};
pub use error::{ConfigError, CoreError, Result, StorageError, ValidationError};
pub use observer::SubscriptionId;
pub use simulation::{reward_for_minutes, MonthSimulator, SimulatedMonth};
pub use state::{ActivityTypes, Category, DailyAggregate, HistoryEntry, Source, State};
pub use storage::{Config, KvStore, MemoryStore, SqliteStore};
