//! In-memory fakes for every external collaborator.
//!
//! The fakes never touch the network. Each one records the calls it receives
//! so tests can assert how many round-trips an operation issued and with which
//! scope.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use taskpanel_core::models::{
    QueueBinding, ScheduledTaskInfo, StoredSchedule, TaskInfo, TaskQuery, TaskRecord, WorkerStats,
};
use taskpanel_core::traits::{
    BroadcastResult, BrokerConnection, BrokerTransport, ChannelOptions, ControlPlane,
    DeclaredQueue, Destination, Replies, ScheduleStore, TaskResultStore, TransportKind,
};
use taskpanel_core::{ClusterHandle, ClusterSettings, PanelError, PanelResult, PanelSettings};

/// One scripted worker and everything it answers with
#[derive(Debug, Clone, Default)]
pub struct FakeWorker {
    pub name: String,
    pub stats: WorkerStats,
    pub active_queues: Vec<QueueBinding>,
    pub active: Vec<TaskInfo>,
    pub reserved: Vec<TaskInfo>,
    pub scheduled: Vec<ScheduledTaskInfo>,
    pub registered: Vec<String>,
}

impl FakeWorker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_stats(mut self, stats: WorkerStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_queue(mut self, binding: QueueBinding) -> Self {
        self.active_queues.push(binding);
        self
    }

    pub fn with_active(mut self, task: TaskInfo) -> Self {
        self.active.push(task);
        self
    }

    pub fn with_reserved(mut self, task: TaskInfo) -> Self {
        self.reserved.push(task);
        self
    }

    pub fn with_scheduled(mut self, task: ScheduledTaskInfo) -> Self {
        self.scheduled.push(task);
        self
    }

    pub fn with_registered(mut self, names: &[&str]) -> Self {
        self.registered
            .extend(names.iter().map(|name| name.to_string()));
        self
    }
}

/// A control-plane request as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCall {
    pub operation: &'static str,
    pub destination: Destination,
}

/// Fake control plane answering from a fixed set of workers
#[derive(Debug, Clone, Default)]
pub struct FakeControlPlane {
    workers: Vec<FakeWorker>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<ControlCall>>>,
}

impl FakeControlPlane {
    /// A cluster with no running workers
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(workers: Vec<FakeWorker>) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Every call fails as if the transport were unreachable
    pub fn unreachable(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn broadcast_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.destination.is_broadcast())
            .count()
    }

    fn answer<T, F>(&self, operation: &'static str, destination: &Destination, pick: F) -> BroadcastResult<T>
    where
        F: Fn(&FakeWorker) -> T,
    {
        self.calls.lock().unwrap().push(ControlCall {
            operation,
            destination: destination.clone(),
        });

        if let Some(message) = &self.failure {
            return Err(PanelError::Unavailable(message.clone()));
        }

        let replies: Replies<T> = self
            .workers
            .iter()
            .filter(|worker| match destination {
                Destination::Broadcast => true,
                Destination::Worker(name) => &worker.name == name,
            })
            .map(|worker| (worker.name.clone(), pick(worker)))
            .collect();

        Ok((!replies.is_empty()).then_some(replies))
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn stats(&self, destination: &Destination) -> BroadcastResult<WorkerStats> {
        self.answer("stats", destination, |w| w.stats.clone())
    }

    async fn active_queues(&self, destination: &Destination) -> BroadcastResult<Vec<QueueBinding>> {
        self.answer("active_queues", destination, |w| w.active_queues.clone())
    }

    async fn active(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        self.answer("active", destination, |w| w.active.clone())
    }

    async fn reserved(&self, destination: &Destination) -> BroadcastResult<Vec<TaskInfo>> {
        self.answer("reserved", destination, |w| w.reserved.clone())
    }

    async fn scheduled(
        &self,
        destination: &Destination,
    ) -> BroadcastResult<Vec<ScheduledTaskInfo>> {
        self.answer("scheduled", destination, |w| w.scheduled.clone())
    }

    async fn registered(&self, destination: &Destination) -> BroadcastResult<Vec<String>> {
        self.answer("registered", destination, |w| w.registered.clone())
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    lists: HashMap<String, u64>,
    declared: HashMap<String, DeclaredQueue>,
    failing_keys: HashSet<String>,
    queried_keys: Vec<String>,
    declared_queries: Vec<String>,
    acquired: usize,
    released: usize,
}

/// Fake broker transport with a configurable kind
#[derive(Debug, Clone)]
pub struct FakeBroker {
    kind: TransportKind,
    name: String,
    options: ChannelOptions,
    acquire_error: Option<String>,
    state: Arc<Mutex<BrokerState>>,
}

impl FakeBroker {
    /// A list-backed transport without priority queues
    pub fn list_backed() -> Self {
        Self::with_kind(TransportKind::ListBacked, "redis")
    }

    pub fn declarative() -> Self {
        Self::with_kind(TransportKind::Declarative, "pyamqp")
    }

    pub fn unsupported(name: &str) -> Self {
        Self::with_kind(TransportKind::Other, name)
    }

    fn with_kind(kind: TransportKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            options: ChannelOptions::default(),
            acquire_error: None,
            state: Arc::new(Mutex::new(BrokerState::default())),
        }
    }

    pub fn with_options(mut self, options: ChannelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_list(self, key: &str, length: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .lists
            .insert(key.to_string(), length);
        self
    }

    pub fn with_declared(self, queue: &str, message_count: u64, consumer_count: u64) -> Self {
        self.state.lock().unwrap().declared.insert(
            queue.to_string(),
            DeclaredQueue {
                message_count,
                consumer_count,
            },
        );
        self
    }

    /// Any query touching `key` fails
    pub fn failing_on(self, key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_keys
            .insert(key.to_string());
        self
    }

    /// Connection acquisition itself fails
    pub fn refusing(mut self, message: &str) -> Self {
        self.acquire_error = Some(message.to_string());
        self
    }

    pub fn queried_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().queried_keys.clone()
    }

    pub fn declared_queries(&self) -> Vec<String> {
        self.state.lock().unwrap().declared_queries.clone()
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }

    pub fn released(&self) -> usize {
        self.state.lock().unwrap().released
    }
}

#[async_trait]
impl BrokerTransport for FakeBroker {
    fn transport_name(&self) -> &str {
        &self.name
    }

    async fn acquire(&self) -> PanelResult<Box<dyn BrokerConnection>> {
        if let Some(message) = &self.acquire_error {
            return Err(PanelError::Broker(message.clone()));
        }
        self.state.lock().unwrap().acquired += 1;
        Ok(Box::new(FakeConnection {
            kind: self.kind,
            name: self.name.clone(),
            options: self.options.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeConnection {
    kind: TransportKind,
    name: String,
    options: ChannelOptions,
    state: Arc<Mutex<BrokerState>>,
}

#[async_trait]
impl BrokerConnection for FakeConnection {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn transport_name(&self) -> &str {
        &self.name
    }

    async fn channel_options(&mut self) -> PanelResult<ChannelOptions> {
        Ok(self.options.clone())
    }

    async fn list_length(&mut self, key: &str) -> PanelResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.queried_keys.push(key.to_string());
        if state.failing_keys.contains(key) {
            return Err(PanelError::Broker(format!("connection reset while reading {key:?}")));
        }
        // 不存在的列表长度为 0
        Ok(state.lists.get(key).copied().unwrap_or(0))
    }

    async fn passive_declare(&mut self, queue: &str) -> PanelResult<DeclaredQueue> {
        let mut state = self.state.lock().unwrap();
        state.declared_queries.push(queue.to_string());
        if state.failing_keys.contains(queue) {
            return Err(PanelError::Broker(format!("channel closed while declaring {queue}")));
        }
        state
            .declared
            .get(queue)
            .copied()
            .ok_or_else(|| PanelError::Broker(format!("NOT_FOUND - no queue '{queue}'")))
    }

    async fn release(self: Box<Self>) {
        self.state.lock().unwrap().released += 1;
    }
}

/// How an in-memory store fails
#[derive(Debug, Clone)]
enum StoreFailure {
    /// Query failed at runtime
    Query(String),
    /// Backing tables are absent
    NotInstalled(String),
}

impl StoreFailure {
    fn to_error(&self) -> PanelError {
        match self {
            StoreFailure::Query(message) => PanelError::Store(message.clone()),
            StoreFailure::NotInstalled(message) => PanelError::MissingDependency(message.clone()),
        }
    }
}

/// In-memory task-result store
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskResultStore {
    records: Vec<TaskRecord>,
    failure: Option<StoreFailure>,
}

impl InMemoryTaskResultStore {
    pub fn new(records: Vec<TaskRecord>) -> Self {
        Self {
            records,
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(StoreFailure::Query(message.to_string())),
        }
    }

    /// Reachable database without the results tables
    pub fn not_installed(message: &str) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(StoreFailure::NotInstalled(message.to_string())),
        }
    }

    fn check(&self) -> PanelResult<()> {
        match &self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn matching(&self, query: &TaskQuery) -> Vec<TaskRecord> {
        let mut matching: Vec<TaskRecord> = self
            .records
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        matching
    }
}

#[async_trait]
impl TaskResultStore for InMemoryTaskResultStore {
    async fn count(&self, query: &TaskQuery) -> PanelResult<u64> {
        self.check()?;
        Ok(self.matching(query).len() as u64)
    }

    async fn fetch_page(
        &self,
        query: &TaskQuery,
        offset: u64,
        limit: u64,
    ) -> PanelResult<Vec<TaskRecord>> {
        self.check()?;
        Ok(self
            .matching(query)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_by_id(&self, task_id: &str) -> PanelResult<Option<TaskRecord>> {
        self.check()?;
        Ok(self.records.iter().find(|r| r.id == task_id).cloned())
    }
}

/// In-memory schedule store
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleStore {
    entries: Vec<StoredSchedule>,
    failure: Option<StoreFailure>,
}

impl InMemoryScheduleStore {
    pub fn new(entries: Vec<StoredSchedule>) -> Self {
        Self {
            entries,
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            entries: Vec::new(),
            failure: Some(StoreFailure::Query(message.to_string())),
        }
    }

    /// Reachable database without the beat tables
    pub fn not_installed(message: &str) -> Self {
        Self {
            entries: Vec::new(),
            failure: Some(StoreFailure::NotInstalled(message.to_string())),
        }
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn enabled_entries(&self) -> PanelResult<Vec<StoredSchedule>> {
        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }
        Ok(self.entries.iter().filter(|e| e.enabled).cloned().collect())
    }
}

/// Builds a cluster handle around the given fakes with empty settings
pub fn handle_with(control: FakeControlPlane, broker: FakeBroker) -> ClusterHandle {
    ClusterHandle::builder(Arc::new(control), Arc::new(broker)).build()
}

/// Same as [`handle_with`], with cluster and panel settings
pub fn handle_with_settings(
    control: FakeControlPlane,
    broker: FakeBroker,
    settings: ClusterSettings,
    panel_settings: PanelSettings,
) -> ClusterHandle {
    ClusterHandle::builder(Arc::new(control), Arc::new(broker))
        .settings(settings)
        .panel_settings(panel_settings)
        .build()
}
