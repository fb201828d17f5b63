//! # Utility Modules
//!
//! Supporting pieces shared by the core and protocol layers.
//!
//! ## Components
//! - **Checksum**: pluggable payload digest for the header (double SHA-256 by default)
//! - **Logging**: `tracing-subscriber` setup from configuration
//! - **Metrics**: thread-safe codec counters
//! - **Timeout**: deadline and cancellation wrappers for async I/O

pub mod checksum;
pub mod logging;
pub mod metrics;
pub mod timeout;

pub use checksum::{Checksum, DoubleSha256};
