//! SDK service for cloud backups of volumes.
//!
//! [`CloudBackupServer`] validates requests and forwards them to a
//! [`CloudBackupDriver`].  Driver failures surface as
//! [`Code::Internal`](crate::Code::Internal) with a message naming the
//! failed action.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DriverError;
use crate::status::Status;

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupCreateRequest {
    pub volume_id: String,
    pub credential_uuid: String,
    /// Take a full backup instead of an incremental one.
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupCreateResponse {
    pub backup_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupRestoreRequest {
    pub backup_id: String,
    /// Name of the volume to restore into; the driver picks one when empty.
    #[serde(default)]
    pub restore_volume_name: String,
    pub credential_uuid: String,
    /// Node to restore on; any node when empty.
    #[serde(default)]
    pub node_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupRestoreResponse {
    pub restore_volume_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupDeleteRequest {
    pub backup_id: String,
    pub credential_uuid: String,
    /// Delete even if the backup is still referenced.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupDeleteAllRequest {
    pub src_volume_id: String,
    pub credential_uuid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupEnumerateRequest {
    /// Restrict to backups of this volume; every volume when empty.
    #[serde(default)]
    pub src_volume_id: String,
    /// Restrict to backups taken by this cluster; the local cluster when empty.
    #[serde(default)]
    pub cluster_id: String,
    pub credential_uuid: String,
    /// Include backups of every cluster.
    #[serde(default)]
    pub all: bool,
}

/// One backup stored in the cloud.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupInfo {
    pub id: String,
    pub src_volume_id: String,
    pub src_volume_name: String,
    /// RFC 3339 creation time as reported by the driver.
    pub timestamp: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupEnumerateResponse {
    pub backups: Vec<CloudBackupInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupStatusRequest {
    /// Every volume when empty.
    #[serde(default)]
    pub src_volume_id: String,
    /// Only report operations running on this node.
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloudBackupOpType {
    Backup,
    Restore,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloudBackupStatusType {
    NotStarted,
    Active,
    Paused,
    Stopped,
    Done,
    Failed,
}

/// Progress of one backup or restore operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupStatus {
    pub backup_id: String,
    pub op_type: CloudBackupOpType,
    pub status: CloudBackupStatusType,
    pub bytes_done: u64,
    pub node_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupStatusResponse {
    /// Keyed by source volume id.
    pub statuses: HashMap<String, CloudBackupStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupCatalogRequest {
    pub backup_id: String,
    pub credential_uuid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupCatalogResponse {
    /// Paths of the files contained in the backup.
    pub contents: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupHistoryRequest {
    pub src_volume_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupHistoryItem {
    pub src_volume_id: String,
    pub timestamp: String,
    pub status: CloudBackupStatusType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudBackupHistoryResponse {
    pub history: Vec<CloudBackupHistoryItem>,
}

/// State a running backup should move to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloudBackupRequestedState {
    #[default]
    Unknown,
    Pause,
    Resume,
    Stop,
}

impl CloudBackupRequestedState {
    /// Name understood by drivers; `None` for [`Self::Unknown`].
    pub fn as_driver_str(&self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            Self::Pause => Some("pause"),
            Self::Resume => Some("resume"),
            Self::Stop => Some("stop"),
        }
    }
}

impl fmt::Display for CloudBackupRequestedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_driver_str().unwrap_or("unknown"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudBackupStateChangeRequest {
    pub src_volume_id: String,
    pub requested_state: CloudBackupRequestedState,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Volume driver capable of backing volumes up to cloud storage.
#[async_trait]
pub trait CloudBackupDriver: Send + Sync {
    /// Start a backup and return its id.
    async fn cloud_backup_create(&self, req: &CloudBackupCreateRequest) -> Result<String, DriverError>;

    /// Restore a backup and return the id of the restored volume.
    async fn cloud_backup_restore(
        &self,
        req: &CloudBackupRestoreRequest,
    ) -> Result<String, DriverError>;

    async fn cloud_backup_delete(&self, req: &CloudBackupDeleteRequest) -> Result<(), DriverError>;

    async fn cloud_backup_delete_all(
        &self,
        req: &CloudBackupDeleteAllRequest,
    ) -> Result<(), DriverError>;

    async fn cloud_backup_enumerate(
        &self,
        req: &CloudBackupEnumerateRequest,
    ) -> Result<Vec<CloudBackupInfo>, DriverError>;

    async fn cloud_backup_status(
        &self,
        req: &CloudBackupStatusRequest,
    ) -> Result<HashMap<String, CloudBackupStatus>, DriverError>;

    async fn cloud_backup_catalog(
        &self,
        req: &CloudBackupCatalogRequest,
    ) -> Result<Vec<String>, DriverError>;

    async fn cloud_backup_history(
        &self,
        req: &CloudBackupHistoryRequest,
    ) -> Result<Vec<CloudBackupHistoryItem>, DriverError>;

    /// Move the backup of `src_volume_id` to `requested_state`, one of
    /// `"pause"`, `"resume"` or `"stop"`.
    async fn cloud_backup_state_change(
        &self,
        src_volume_id: &str,
        requested_state: &str,
    ) -> Result<(), DriverError>;
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn driver_failure(action: &str) -> impl FnOnce(DriverError) -> Status + '_ {
    move |e| {
        warn!(action, error = %e, "cloud backup driver call failed");
        Status::internal(format!("Failed to {action}: {e}"))
    }
}

fn require(value: &str, message: &str) -> Result<(), Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(message));
    }
    Ok(())
}

/// Cloud backup API as exposed to SDK clients.
pub struct CloudBackupServer<D: ?Sized> {
    driver: Arc<D>,
}

impl<D: CloudBackupDriver + ?Sized> CloudBackupServer<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    pub async fn create(
        &self,
        req: CloudBackupCreateRequest,
    ) -> Result<CloudBackupCreateResponse, Status> {
        require(&req.volume_id, "Must supply a volume id")?;
        require(&req.credential_uuid, "Must supply credential uuid")?;

        let backup_id = self
            .driver
            .cloud_backup_create(&req)
            .await
            .map_err(driver_failure("create backup"))?;
        debug!(volume_id = %req.volume_id, %backup_id, "cloud backup started");
        Ok(CloudBackupCreateResponse { backup_id })
    }

    pub async fn restore(
        &self,
        req: CloudBackupRestoreRequest,
    ) -> Result<CloudBackupRestoreResponse, Status> {
        require(&req.backup_id, "Must provide backup id")?;
        require(&req.credential_uuid, "Must provide credential uuid")?;

        let restore_volume_id = self
            .driver
            .cloud_backup_restore(&req)
            .await
            .map_err(driver_failure("restore backup"))?;
        Ok(CloudBackupRestoreResponse { restore_volume_id })
    }

    pub async fn delete(&self, req: CloudBackupDeleteRequest) -> Result<(), Status> {
        require(&req.backup_id, "Must provide backup id")?;
        require(&req.credential_uuid, "Must provide credential uuid")?;

        self.driver
            .cloud_backup_delete(&req)
            .await
            .map_err(driver_failure("delete backup"))
    }

    pub async fn delete_all(&self, req: CloudBackupDeleteAllRequest) -> Result<(), Status> {
        require(&req.src_volume_id, "Must provide source volume id")?;
        require(&req.credential_uuid, "Must provide credential uuid")?;

        self.driver
            .cloud_backup_delete_all(&req)
            .await
            .map_err(driver_failure("delete backup"))
    }

    pub async fn enumerate(
        &self,
        req: CloudBackupEnumerateRequest,
    ) -> Result<CloudBackupEnumerateResponse, Status> {
        require(&req.credential_uuid, "Must provide credential uuid")?;

        let backups = self
            .driver
            .cloud_backup_enumerate(&req)
            .await
            .map_err(driver_failure("enumerate backups"))?;
        Ok(CloudBackupEnumerateResponse { backups })
    }

    /// Progress of running operations; no argument is required.
    pub async fn status(
        &self,
        req: CloudBackupStatusRequest,
    ) -> Result<CloudBackupStatusResponse, Status> {
        let statuses = self
            .driver
            .cloud_backup_status(&req)
            .await
            .map_err(driver_failure("get status of backup"))?;
        Ok(CloudBackupStatusResponse { statuses })
    }

    pub async fn catalog(
        &self,
        req: CloudBackupCatalogRequest,
    ) -> Result<CloudBackupCatalogResponse, Status> {
        require(&req.backup_id, "Must provide backup id")?;
        require(&req.credential_uuid, "Must provide credential uuid")?;

        let contents = self
            .driver
            .cloud_backup_catalog(&req)
            .await
            .map_err(driver_failure("get catalog"))?;
        Ok(CloudBackupCatalogResponse { contents })
    }

    pub async fn history(
        &self,
        req: CloudBackupHistoryRequest,
    ) -> Result<CloudBackupHistoryResponse, Status> {
        require(&req.src_volume_id, "Must provide volume id")?;

        let history = self
            .driver
            .cloud_backup_history(&req)
            .await
            .map_err(driver_failure("get history"))?;
        Ok(CloudBackupHistoryResponse { history })
    }

    pub async fn state_change(&self, req: CloudBackupStateChangeRequest) -> Result<(), Status> {
        require(&req.src_volume_id, "Must provide volume id")?;
        let state = req
            .requested_state
            .as_driver_str()
            .ok_or_else(|| Status::invalid_argument("Must provide requested state"))?;

        self.driver
            .cloud_backup_state_change(&req.src_volume_id, state)
            .await
            .map_err(driver_failure("change state"))
    }
}
