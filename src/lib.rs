//! Instrumented "roll a die" HTTP service.
//!
//! Each `GET /rolldice` is timed into a duration histogram, traced by a
//! SERVER span, and rolls the die inside an INTERNAL span carrying dice
//! attributes, an event, a link to the startup span and the process baggage.

pub mod config;
pub mod dice;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;
