//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging → Init telemetry → Bind listener → Serve
//!
//! Shutdown:
//!     SIGINT/SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests
//!     → telemetry flushes queued spans
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
