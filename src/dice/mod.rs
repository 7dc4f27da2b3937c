//! Dice domain.
//!
//! # Data Flow
//! ```text
//! GET /rolldice
//!     → service.rs (DiceRoller: span "roll_dice", link to setup span)
//!     → generator.rs (uniform draw in 1..=6)
//! ```

pub mod generator;
pub mod service;

pub use generator::{random_in_range, DiceError};
pub use service::DiceRoller;
