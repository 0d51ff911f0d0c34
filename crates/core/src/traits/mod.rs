//! 外部协作方的接口契约

pub mod broker;
pub mod control_plane;
pub mod stores;

pub use broker::{
    BrokerConnection, BrokerTransport, ChannelOptions, DeclaredQueue, TransportKind,
    DEFAULT_PRIORITY_SEP, DEFAULT_PRIORITY_STEPS,
};
pub use control_plane::{BroadcastResult, ControlPlane, Destination, Replies, WorkerSnapshot};
pub use stores::{ScheduleStore, TaskResultStore};
