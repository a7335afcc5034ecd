//! # libkvdb: coordination store interface
//!
//! Every piece of cluster state that must be shared between the nodes of a
//! cluster lives in a distributed key-value store.  `libkvdb` defines the
//! capability set the rest of the workspace consumes from that store and
//! ships an in-process implementation used by single-node deployments and
//! tests.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`store`] | [`Kvdb`] trait: CRUD, prefix enumeration, named locks; [`KvdbExt`] JSON helpers. |
//! | [`guard`] | [`LockGuard`]: lock ownership released on every exit path. |
//! | [`memory`] | [`MemKvdb`]: ordered in-memory store with fault injection. |
//! | [`types`] | [`KvPair`] and [`KvLock`]. |
//! | [`error`] | [`KvdbError`] including the `NotFound` sentinel. |

pub mod error;
pub mod guard;
pub mod memory;
pub mod store;
pub mod types;

pub use error::KvdbError;
pub use guard::LockGuard;
pub use memory::MemKvdb;
pub use store::{Kvdb, KvdbExt};
pub use types::{KvLock, KvPair};
