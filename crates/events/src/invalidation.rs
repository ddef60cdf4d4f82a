//! Post-commit cache invalidation port.
//!
//! The registry calls [`CacheInvalidator::invalidate`] exactly once for each
//! committed mutation and never for rolled-back or no-op calls. The hook
//! cannot fail the operation: by the time it runs the change is durable, so
//! implementations handle (and log) their own errors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::{EventBus, RegistryMutation};

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, mutation: &RegistryMutation);
}

/// Invalidator that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _mutation: &RegistryMutation) {}
}

/// Invalidator that republishes each mutation on an [`EventBus`], letting any
/// number of in-process caches subscribe.
#[derive(Clone)]
pub struct BusInvalidator {
    bus: Arc<EventBus>,
}

impl BusInvalidator {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl CacheInvalidator for BusInvalidator {
    async fn invalidate(&self, mutation: &RegistryMutation) {
        let reached = self.bus.publish(mutation.clone());
        tracing::debug!(
            operation = mutation.operation.as_str(),
            subject_id = mutation.subject_id,
            reached,
            "Published registry mutation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Operation;

    #[tokio::test]
    async fn bus_invalidator_forwards_to_subscribers() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let invalidator = BusInvalidator::new(Arc::clone(&bus));

        invalidator
            .invalidate(&RegistryMutation::new(Operation::SoftDelete, "category", 5))
            .await;

        let received = rx.recv().await.expect("should receive");
        assert_eq!(received.operation, Operation::SoftDelete);
        assert_eq!(received.subject_id, 5);
    }
}
