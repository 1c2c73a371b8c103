//! Common utilities and shared types for inkpost.
//!
//! This crate provides foundational components used across all inkpost crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Metrics**: Process-wide counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use inkpost_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod metrics;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use metrics::{Metrics, MetricsSnapshot, Timer, get_metrics};
