//! objproxy daemon
//!
//! Serves named objects from a storage backend over a local Unix socket,
//! one request per connection, with an optional decryption stage and a
//! plaintext monitoring listener that lists in-flight clients.

pub mod crypto;
pub mod dispatcher;
pub mod lifecycle;
pub mod logging;
pub mod monitor;
pub mod notifier;
pub mod registry;
pub mod server;
pub mod storage;

pub use crypto::{seal, CryptoError, Decrypter, SealedStreamDecrypter};
pub use dispatcher::{DispatchError, DispatchResult, Dispatcher};
pub use lifecycle::{run_until_shutdown, spawn_signal_listener, LifecycleEvent};
pub use logging::{LogFile, LogHandle};
pub use monitor::render_snapshot;
pub use notifier::Notifier;
pub use registry::{ClientId, ClientRecord, ClientRegistry, ConnectedClient, OpType};
pub use server::{Daemon, ServerConfig};
pub use storage::{FsStorage, MemoryStorage, ObjectReader, StorageError, StorageReader};
