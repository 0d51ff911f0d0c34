use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::time::timeout;
use tracing::{debug, instrument};

use taskpanel_core::traits::{BrokerConnection, BrokerTransport, ChannelOptions, TransportKind};
use taskpanel_core::{PanelError, PanelResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// 列表型传输：每个队列是一个 Redis 列表
pub struct RedisTransport {
    url: String,
    options: ChannelOptions,
}

impl RedisTransport {
    pub fn new(broker_url: &str, options: ChannelOptions) -> Self {
        Self {
            url: normalize_url(broker_url),
            options,
        }
    }
}

/// 套接字形式的 scheme 换成 redis 客户端认识的写法
fn normalize_url(url: &str) -> String {
    match url.strip_prefix("redis+socket://") {
        Some(path) => format!("redis+unix://{path}"),
        None => url.to_string(),
    }
}

#[async_trait]
impl BrokerTransport for RedisTransport {
    fn transport_name(&self) -> &str {
        "redis"
    }

    #[instrument(skip(self))]
    async fn acquire(&self) -> PanelResult<Box<dyn BrokerConnection>> {
        let client = Client::open(self.url.as_str())
            .map_err(|e| PanelError::Broker(format!("invalid Redis URL: {e}")))?;
        let conn = timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| PanelError::Broker("timed out connecting to Redis".to_string()))?
            .map_err(|e| PanelError::Broker(e.to_string()))?;
        debug!("已获取Redis连接");
        Ok(Box::new(RedisConnection {
            conn,
            options: self.options.clone(),
        }))
    }
}

struct RedisConnection {
    conn: MultiplexedConnection,
    options: ChannelOptions,
}

#[async_trait]
impl BrokerConnection for RedisConnection {
    fn kind(&self) -> TransportKind {
        TransportKind::ListBacked
    }

    fn transport_name(&self) -> &str {
        "redis"
    }

    async fn channel_options(&mut self) -> PanelResult<ChannelOptions> {
        Ok(self.options.clone())
    }

    async fn list_length(&mut self, key: &str) -> PanelResult<u64> {
        let length: u64 = self
            .conn
            .llen(key)
            .await
            .map_err(|e| PanelError::Broker(e.to_string()))?;
        Ok(length)
    }

    async fn release(self: Box<Self>) {
        debug!("归还Redis连接");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_scheme_is_rewritten() {
        assert_eq!(
            normalize_url("redis+socket:///tmp/redis.sock"),
            "redis+unix:///tmp/redis.sock"
        );
        assert_eq!(normalize_url("redis://localhost/0"), "redis://localhost/0");
    }

    #[tokio::test]
    async fn test_invalid_url_fails_on_acquire() {
        let transport = RedisTransport::new("redis://[::1", ChannelOptions::default());
        assert!(transport.acquire().await.is_err());
    }

    #[tokio::test]
    #[ignore] // 需要本地Redis
    async fn test_priority_depth_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into());
        let client = Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = redis::cmd("DEL")
            .arg("taskpanel_it")
            .arg("taskpanel_it\x06\x163")
            .query_async(&mut conn)
            .await
            .unwrap();
        let _: () = conn.rpush("taskpanel_it", "a").await.unwrap();
        let _: () = conn.rpush("taskpanel_it\x06\x163", "b").await.unwrap();

        let transport = RedisTransport::new(&url, ChannelOptions::priority());
        let mut broker_conn = transport.acquire().await.unwrap();
        assert_eq!(broker_conn.list_length("taskpanel_it").await.unwrap(), 1);
        assert_eq!(broker_conn.list_length("taskpanel_it\x06\x163").await.unwrap(), 1);
        broker_conn.release().await;
    }
}
