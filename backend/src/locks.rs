//! Per-entity async locks
//!
//! Serializes lifecycle transitions on a single quotation inside this
//! process. The repositories still check `version` on write, so a second
//! process racing on the same row gets a `Conflict` instead of a lost update.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the lock for one entity
    pub async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.slot(id).lock_owned().await
    }

    /// Acquire locks for several entities in ascending id order
    pub async fn lock_many(&self, ids: &[Uuid]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock(id).await);
        }
        guards
    }

    /// Drop slots nobody holds
    pub fn prune(&self) {
        self.locks.retain(|_, slot| Arc::strong_count(slot) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
