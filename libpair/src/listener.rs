//! Cluster lifecycle listeners.
//!
//! Drivers, schedulers and other pluggable components implement
//! [`ClusterListener`] to keep their own state in step with pairing events.
//! [`ListenerRegistry`] fans each event out to every listener in
//! registration order and stops at the first failure; listeners notified
//! before the failing one are not rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::error::PairError;
use crate::types::{ClusterPairProcessResponse, NodeInfo};

/// A component notified of pairing lifecycle events.
///
/// Both hooks default to a no-op so a listener only implements the events
/// it cares about.
#[async_trait]
pub trait ClusterListener: Send + Sync {
    /// Stable display name used in logs and errors.
    fn name(&self) -> &str;

    /// This cluster is about to record a pair with the cluster described by
    /// `response`.
    async fn create_pair(
        &self,
        _self_node: &NodeInfo,
        _response: &ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        Ok(())
    }

    /// A remote cluster presented a valid token; the listener may add
    /// entries to `response.options` for the initiator.
    async fn process_pair_request(
        &self,
        _self_node: &NodeInfo,
        _response: &mut ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        Ok(())
    }
}

/// Ordered set of registered listeners.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn ClusterListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener`; it is notified after every listener registered
    /// before it.
    pub fn register(&mut self, listener: Arc<dyn ClusterListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listener names in notification order.
    pub fn names(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    pub async fn notify_create_pair(
        &self,
        self_node: &NodeInfo,
        response: &ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        for listener in &self.listeners {
            if let Err(e) = listener.create_pair(self_node, response).await {
                error!(
                    listener = listener.name(),
                    error = %e,
                    "unable to notify listener of a cluster pair event"
                );
                return Err(rejected(listener.as_ref(), e));
            }
        }
        Ok(())
    }

    pub async fn notify_process_pair_request(
        &self,
        self_node: &NodeInfo,
        response: &mut ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        for listener in &self.listeners {
            if let Err(e) = listener.process_pair_request(self_node, response).await {
                error!(
                    listener = listener.name(),
                    error = %e,
                    "unable to notify listener of a remote pair request"
                );
                return Err(rejected(listener.as_ref(), e));
            }
        }
        Ok(())
    }
}

fn rejected(listener: &dyn ClusterListener, e: PairError) -> PairError {
    PairError::ListenerRejected {
        listener: listener.name().to_owned(),
        reason: e.to_string(),
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
