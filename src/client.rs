//! Generation client: request lifecycle, configuration, and batch fan-out.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod batch;
pub mod builder;
pub mod config;
pub mod core;

pub use batch::{BatchItemResult, BatchOutcome};
pub use builder::QrClientBuilder;
pub use config::ClientConfig;
pub use core::QrClient;
