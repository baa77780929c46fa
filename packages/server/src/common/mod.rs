// Common types and utilities shared across the application

pub mod text;
pub mod types;

pub use text::*;
pub use types::*;
