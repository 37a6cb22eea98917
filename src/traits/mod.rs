pub mod coordinator_client;
pub mod materializer;
pub mod meta_store;
