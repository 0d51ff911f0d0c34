//! 外部系统适配器
//!
//! - **control_plane**: 控制平面 HTTP 网关客户端
//! - **broker**: 队列深度探测所用的 Redis / AMQP 传输
//! - **database**: PostgreSQL 上的任务结果存储与调度存储

pub mod broker;
pub mod control_plane;
pub mod database;

pub use broker::{broker_transport_for, channel_options, AmqpTransport, RedisTransport, UnsupportedTransport};
pub use control_plane::{DisconnectedControlPlane, HttpControlPlane};
pub use database::{connect_pool, PostgresScheduleStore, PostgresTaskResultStore};
