//! SchoolDesk Core - shared infrastructure
//!
//! Configuration, error handling, logging and the role vocabulary used by
//! every other SchoolDesk crate.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
