//! Research domain: submission, the background research pipeline and its
//! read paths.

pub mod activities;
pub mod data;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod store;

pub use errors::{ResearchAccessDenied, ResearchNotFound, ValidationError};
