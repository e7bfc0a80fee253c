//! Error plumbing shared by the skillman crates.

pub mod error;

pub use error::FromMessage;
