//! SDK service for named snapshot/backup schedules.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DriverError;
use crate::status::Status;

/// A named schedule.  `schedule` is the driver's opaque schedule text,
/// e.g. `"freq:periodic\nperiod:120000\n"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub name: String,
    pub schedule: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePolicyCreateRequest {
    pub schedule_policy: Option<SchedulePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePolicyUpdateRequest {
    pub schedule_policy: Option<SchedulePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulePolicyEnumerateResponse {
    pub policies: Vec<SchedulePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulePolicyInspectResponse {
    pub policy: SchedulePolicy,
}

/// Persists schedule policies.
#[async_trait]
pub trait SchedulePolicyProvider: Send + Sync {
    async fn sched_policy_create(&self, name: &str, schedule: &str) -> Result<(), DriverError>;

    async fn sched_policy_update(&self, name: &str, schedule: &str) -> Result<(), DriverError>;

    async fn sched_policy_enumerate(&self) -> Result<Vec<SchedulePolicy>, DriverError>;

    async fn sched_policy_get(&self, name: &str) -> Result<SchedulePolicy, DriverError>;

    async fn sched_policy_delete(&self, name: &str) -> Result<(), DriverError>;
}

fn validate(policy: Option<&SchedulePolicy>) -> Result<&SchedulePolicy, Status> {
    let policy =
        policy.ok_or_else(|| Status::invalid_argument("SchedulePolicy object cannot be nil"))?;
    if policy.name.is_empty() {
        return Err(Status::invalid_argument("Must supply Schedule name"));
    }
    if policy.schedule.is_empty() {
        return Err(Status::invalid_argument("Must supply Schedule"));
    }
    Ok(policy)
}

fn require_name(name: &str) -> Result<(), Status> {
    if name.is_empty() {
        return Err(Status::invalid_argument("Must supply Schedule name"));
    }
    Ok(())
}

fn provider_failure(message: &'static str) -> impl FnOnce(DriverError) -> Status {
    move |e| {
        warn!(error = %e, "{message}");
        Status::internal(format!("{message}: {e}"))
    }
}

/// Schedule policy API as exposed to SDK clients.
pub struct SchedulePolicyServer<P: ?Sized> {
    provider: Arc<P>,
}

impl<P: SchedulePolicyProvider + ?Sized> SchedulePolicyServer<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    pub async fn create(&self, req: SchedulePolicyCreateRequest) -> Result<(), Status> {
        let policy = validate(req.schedule_policy.as_ref())?;
        self.provider
            .sched_policy_create(&policy.name, &policy.schedule)
            .await
            .map_err(provider_failure("Failed to create schedule policy"))
    }

    pub async fn update(&self, req: SchedulePolicyUpdateRequest) -> Result<(), Status> {
        let policy = validate(req.schedule_policy.as_ref())?;
        self.provider
            .sched_policy_update(&policy.name, &policy.schedule)
            .await
            .map_err(provider_failure("Failed to update schedule policy"))
    }

    pub async fn enumerate(&self) -> Result<SchedulePolicyEnumerateResponse, Status> {
        let policies = self
            .provider
            .sched_policy_enumerate()
            .await
            .map_err(provider_failure("Failed to enumerate schedule policies"))?;
        Ok(SchedulePolicyEnumerateResponse { policies })
    }

    pub async fn inspect(&self, name: &str) -> Result<SchedulePolicyInspectResponse, Status> {
        require_name(name)?;
        let policy = self
            .provider
            .sched_policy_get(name)
            .await
            .map_err(provider_failure("Failed to inspect schedule policy"))?;
        Ok(SchedulePolicyInspectResponse { policy })
    }

    pub async fn delete(&self, name: &str) -> Result<(), Status> {
        require_name(name)?;
        self.provider
            .sched_policy_delete(name)
            .await
            .map_err(provider_failure("Failed to delete schedule policy"))
    }
}
