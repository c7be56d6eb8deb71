//! Command implementations for polylsp
//!
//! Each command is implemented in its own module.

pub mod doctor;
pub mod hierarchy;
pub mod refs;
pub mod symbols;
