//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`ClockReplacer`] - Second-chance replacement over the descriptor table

mod clock;

pub use clock::{ClockReplacer, Victim};
