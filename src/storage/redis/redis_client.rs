use redis::cluster_async::ClusterConnection;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RedisClient {
    cluster: bool,
    cluster_conn: Option<Arc<Mutex<ClusterConnection>>>,
    single_conn: Option<Arc<Mutex<MultiplexedConnection>>>,
}

impl RedisClient {
    pub fn new(cluster: bool, cluster_conn: Option<Arc<Mutex<ClusterConnection>>>, single_conn: Option<Arc<Mutex<MultiplexedConnection>>>) -> Self {
        Self {
            cluster,
            cluster_conn,
            single_conn,
        }
    }

    fn missing_connection(&self) -> anyhow::Error {
        anyhow::anyhow!("redis client has no {} connection", if self.cluster { "cluster" } else { "single" })
    }

    pub async fn hset(&self, key: &str, field: &str, value: &[u8]) -> anyhow::Result<()> {
        if self.cluster {
            if let Some(conn) = &self.cluster_conn {
                let mut conn = conn.lock().await;
                let _: () = conn.hset(key, field, value).await?;
                return Ok(());
            }
        } else if let Some(conn) = &self.single_conn {
            let mut conn = conn.lock().await;
            let _: () = conn.hset(key, field, value).await?;
            return Ok(());
        }
        Err(self.missing_connection())
    }

    pub async fn hdel(&self, key: &str, field: &str) -> anyhow::Result<usize> {
        if self.cluster {
            if let Some(conn) = &self.cluster_conn {
                let mut conn = conn.lock().await;
                let result: usize = conn.hdel(key, field).await?;
                return Ok(result);
            }
        } else if let Some(conn) = &self.single_conn {
            let mut conn = conn.lock().await;
            let result: usize = conn.hdel(key, field).await?;
            return Ok(result);
        }
        Err(self.missing_connection())
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<usize> {
        if self.cluster {
            if let Some(conn) = &self.cluster_conn {
                let mut conn = conn.lock().await;
                let result: usize = conn.del(key).await?;
                return Ok(result);
            }
        } else if let Some(conn) = &self.single_conn {
            let mut conn = conn.lock().await;
            let result: usize = conn.del(key).await?;
            return Ok(result);
        }
        Err(self.missing_connection())
    }

    pub async fn hgetall(&self, key: &str) -> anyhow::Result<HashMap<String, Vec<u8>>> {
        if self.cluster {
            if let Some(conn) = &self.cluster_conn {
                let mut conn = conn.lock().await;
                let result: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;
                return Ok(result);
            }
        } else if let Some(conn) = &self.single_conn {
            let mut conn = conn.lock().await;
            let result: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;
            return Ok(result);
        }
        Err(self.missing_connection())
    }
}
