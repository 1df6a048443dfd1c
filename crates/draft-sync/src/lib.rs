//! draft-sync: offline-first local data layer and sync engine for the
//! manuscript editor.
//!
//! This crate provides:
//! - `LocalStore`: durable key-addressed storage, the single source of truth
//!   for the UI, with a JSON snapshot boundary at process start/stop
//! - The pending-operation queue: an append-only intent log
//! - `RemoteStore` trait + row mapping: the only points where the core
//!   touches a transport
//! - `SyncEngine`: pull/push reconciliation with last-writer-wins conflict
//!   resolution at document granularity
//! - `Studio`: the state container owning the UI-facing mutation path

pub mod engine;
pub mod events;
pub mod queue;
pub mod remote;
pub mod rows;
pub mod store;
pub mod studio;

pub use engine::{PushOutcome, SyncEngine, SyncError, SyncSummary};
pub use events::{EventBus, Subscription, SyncEvent};
pub use queue::{OpKind, PendingOp, RecordTable};
pub use remote::{InMemoryRemote, RemoteError, RemoteStore};
pub use store::{LocalStore, StoreError};
pub use studio::{Studio, StudioError};
