//! Registry of live client connections.
//!
//! Every accepted connection is registered before any bytes are read and
//! removed exactly once when its task finishes. The monitoring listener
//! enumerates the registry to render a snapshot of in-flight work.

use objproxy_protocol::MessageType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connected client.
///
/// IDs come from a process-wide atomic counter and are never reused within
/// a daemon process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Create a new unique client ID.
    pub fn new() -> Self {
        Self(CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a client is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    /// Connected, request not parsed yet.
    Idle,
    Request(MessageType),
    /// Sent a tag outside the known message types.
    Unsupported(u8),
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Idle => f.write_str("IDLE"),
            OpType::Request(message_type) => write!(f, "{}", message_type),
            OpType::Unsupported(tag) => write!(f, "UNSUPPORTED({})", tag),
        }
    }
}

/// Point-in-time view of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub op_type: OpType,
    /// Object name being operated on; empty until known.
    pub external_path: String,
}

#[derive(Debug)]
struct ClientState {
    op_type: OpType,
    external_path: String,
}

/// A registered connection.
///
/// Shared between the registry (for enumeration) and the connection task
/// (which records the operation once the request is parsed). The
/// connection's byte stream is not owned here.
#[derive(Debug)]
pub struct ConnectedClient {
    id: ClientId,
    state: RwLock<ClientState>,
}

impl ConnectedClient {
    pub fn new() -> Self {
        Self::with_id(ClientId::new())
    }

    pub fn with_id(id: ClientId) -> Self {
        Self {
            id,
            state: RwLock::new(ClientState {
                op_type: OpType::Idle,
                external_path: String::new(),
            }),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Record the in-flight operation. Both fields change under one lock so
    /// readers never see a half-updated record.
    pub fn set_operation(&self, op_type: OpType, external_path: impl Into<String>) {
        let mut state = self.state.write();
        state.op_type = op_type;
        state.external_path = external_path.into();
    }

    pub fn record(&self) -> ClientRecord {
        let state = self.state.read();
        ClientRecord {
            id: self.id,
            op_type: state.op_type,
            external_path: state.external_path.clone(),
        }
    }
}

impl Default for ConnectedClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrency-safe map of live clients.
///
/// Mutations take the write lock; enumeration copies a snapshot under the
/// read lock and visits it after the lock is released, so a slow visitor
/// never blocks inserts or removals.
///
/// # Example
///
/// ```
/// use objproxy_daemon::registry::{ClientRegistry, OpType};
/// use objproxy_protocol::MessageType;
///
/// let registry = ClientRegistry::new();
/// let client = registry.register();
/// client.set_operation(OpType::Request(MessageType::Cat), "backup/chunk1");
///
/// assert_eq!(registry.snapshot().len(), 1);
/// assert!(registry.remove(client.id()).is_some());
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, Arc<ConnectedClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new idle client with a fresh ID.
    pub fn register(&self) -> Arc<ConnectedClient> {
        let client = Arc::new(ConnectedClient::new());
        self.insert(client.clone());
        client
    }

    /// Insert an already-constructed client.
    ///
    /// Returns the previous entry if one with the same ID was present.
    pub fn insert(&self, client: Arc<ConnectedClient>) -> Option<Arc<ConnectedClient>> {
        self.clients.write().insert(client.id(), client)
    }

    /// Remove a client by ID, returning its final record.
    ///
    /// `None` means the ID was not registered; callers treat that as an
    /// anomaly to log, not a failure.
    pub fn remove(&self, id: ClientId) -> Option<ClientRecord> {
        let client = self.clients.write().remove(&id)?;
        Some(client.record())
    }

    pub fn get(&self, id: ClientId) -> Option<ClientRecord> {
        self.clients.read().get(&id).map(|client| client.record())
    }

    /// Copy every current record.
    pub fn snapshot(&self) -> Vec<ClientRecord> {
        self.clients
            .read()
            .values()
            .map(|client| client.record())
            .collect()
    }

    /// Visit a snapshot of all records in unspecified order.
    ///
    /// The first visitor error stops the enumeration and is returned. The
    /// registry itself is not affected.
    pub fn for_each<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&ClientRecord) -> Result<(), E>,
    {
        for record in self.snapshot() {
            visitor(&record)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}
