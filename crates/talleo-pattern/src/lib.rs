//! Talleo Address Pattern Model
//!
//! Pattern types: prefix (vanity search) and exact (key recovery)

mod difficulty;
mod matcher;

pub use difficulty::{calculate_difficulty, format_difficulty};
pub use matcher::{AddressRules, Pattern, PatternError, PatternType};
