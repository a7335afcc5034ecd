//! # libsdk: SDK services over the pairing core and storage drivers
//!
//! The services in this crate sit between an RPC front end and the
//! subsystems that do the work.  Each one validates its arguments, calls
//! into a trait object and reports failures as a [`Status`] carrying a
//! gRPC-compatible [`Code`].
//!
//! | Module | Purpose |
//! |---|---|
//! | [`status`] | [`Status`] and [`Code`]; mapping from `PairError`. |
//! | [`error`] | [`DriverError`] returned by storage drivers. |
//! | [`cluster_pair`] | [`ClusterPairServer`] over `libpair::ClusterPairing`. |
//! | [`cloud_backup`] | [`CloudBackupServer`] over a [`CloudBackupDriver`]. |
//! | [`schedule_policy`] | [`SchedulePolicyServer`] over a [`SchedulePolicyProvider`]. |

pub mod cloud_backup;
pub mod cluster_pair;
pub mod error;
pub mod schedule_policy;
pub mod status;

pub use cloud_backup::*;
pub use cluster_pair::ClusterPairServer;
pub use error::DriverError;
pub use schedule_policy::*;
pub use status::{Code, Status};
