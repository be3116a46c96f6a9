//! Active-model registry with lock-free reads.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::domain::{ModelNamespace, ModelVersion};
use crate::error::Result;
use crate::port::ModelStore;

type VersionMap = HashMap<ModelNamespace, Arc<ModelVersion>>;

/// In-process view of the active model per namespace.
///
/// Readers `load()` an immutable snapshot and keep it for the duration
/// of a scoring call; promotion builds a new map and swaps the pointer,
/// so in-flight readers are never torn or blocked. At most one version
/// is active per namespace.
pub struct ModelRegistry {
    active: ArcSwap<VersionMap>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// The active version for a namespace, if any. Lock-free.
    #[must_use]
    pub fn active(&self, namespace: &ModelNamespace) -> Option<Arc<ModelVersion>> {
        self.active.load().get(namespace).cloned()
    }

    /// Number of namespaces with an active version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.load().is_empty()
    }

    /// Install a version as active for its namespace, in memory only.
    ///
    /// Copy-on-write: clones the current map, replaces the entry, swaps.
    pub fn install(&self, version: Arc<ModelVersion>) {
        let mut map: VersionMap = (**self.active.load()).clone();
        map.insert(version.namespace.clone(), version);
        self.active.store(Arc::new(map));
    }

    /// Promote a trained version: persist the activation first, then
    /// swap it in. A store failure leaves the registry untouched.
    pub async fn promote(&self, store: &dyn ModelStore, version: ModelVersion) -> Result<()> {
        store.save_version(&version).await?;
        store.activate(&version.namespace, &version.version_id).await?;
        let mut version = version;
        version.is_active = true;
        self.install(Arc::new(version));
        Ok(())
    }

    /// Load persisted active versions for the given namespaces.
    ///
    /// Returns how many namespaces came up with an active model.
    pub async fn hydrate(
        &self,
        store: &dyn ModelStore,
        namespaces: &[ModelNamespace],
    ) -> Result<usize> {
        let mut loaded = 0;
        for namespace in namespaces {
            if let Some(version) = store.active_version(namespace).await? {
                self.install(Arc::new(version));
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::store::MemoryStore;
    use crate::domain::VersionId;
    use chrono::Utc;

    fn version(namespace: ModelNamespace, metric: f64) -> ModelVersion {
        ModelVersion {
            namespace,
            version_id: VersionId::new(),
            trained_at: Utc::now(),
            metric,
            weights: vec![0.1, -0.2, 0.3],
            bias: 0.05,
            feature_count: 3,
            is_active: false,
        }
    }

    #[test]
    fn empty_registry_has_no_active_version() {
        let registry = ModelRegistry::new();
        assert!(registry.active(&ModelNamespace::Global).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn install_makes_a_version_visible() {
        let registry = ModelRegistry::new();
        registry.install(Arc::new(version(ModelNamespace::Global, 0.7)));
        let active = registry.active(&ModelNamespace::Global).unwrap();
        assert!((active.metric - 0.7).abs() < f64::EPSILON);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn promote_persists_then_swaps() {
        let store = MemoryStore::new();
        let registry = ModelRegistry::new();

        let first = version(ModelNamespace::Global, 0.65);
        registry.promote(&store, first.clone()).await.unwrap();
        let second = version(ModelNamespace::Global, 0.72);
        registry.promote(&store, second.clone()).await.unwrap();

        let active = registry.active(&ModelNamespace::Global).unwrap();
        assert_eq!(active.version_id, second.version_id);
        assert!(active.is_active);

        // The store agrees, and the prior version was deactivated.
        let persisted = store
            .active_version(&ModelNamespace::Global)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted.version_id, second.version_id);
        let versions = store.list_versions(&ModelNamespace::Global).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions.iter().filter(|v| v.is_active).count(), 1);
    }

    #[tokio::test]
    async fn in_flight_snapshot_survives_promotion() {
        let store = MemoryStore::new();
        let registry = ModelRegistry::new();
        let first = version(ModelNamespace::Global, 0.65);
        registry.promote(&store, first.clone()).await.unwrap();

        let held = registry.active(&ModelNamespace::Global).unwrap();
        let second = version(ModelNamespace::Global, 0.8);
        registry.promote(&store, second).await.unwrap();

        // The earlier snapshot is still intact for its holder.
        assert_eq!(held.version_id, first.version_id);
    }

    #[tokio::test]
    async fn hydrate_loads_persisted_actives() {
        let store = MemoryStore::new();
        let ns = ModelNamespace::Pattern("hammer".into());
        let seeded = ModelRegistry::new();
        seeded.promote(&store, version(ns.clone(), 0.66)).await.unwrap();

        let fresh = ModelRegistry::new();
        let loaded = fresh
            .hydrate(&store, &[ModelNamespace::Global, ns.clone()])
            .await
            .unwrap();
        assert_eq!(loaded, 1);
        assert!(fresh.active(&ns).is_some());
        assert!(fresh.active(&ModelNamespace::Global).is_none());
    }
}
