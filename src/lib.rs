#![allow(clippy::async_fn_in_trait)]
pub mod agent;
pub mod common;
pub mod storage;
pub mod traits;

pub use agent::agent::{CoordinatorAgent, agent_start};
