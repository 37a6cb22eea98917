pub mod config;
pub mod diff;
pub mod error;
pub mod node;
pub mod response;
pub mod snapshot;
