pub mod file { 
    pub mod file_materializer;
    pub mod file_meta_store;
}
pub mod redis {
    pub mod redis_client;
    pub mod redis_meta_store;
}
pub mod meta_store_impl;
