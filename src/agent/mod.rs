pub mod agent;
pub mod heartbeat;
pub mod identity;
pub mod loader;
pub mod registration;
pub mod synchronizer;
pub mod transport;
