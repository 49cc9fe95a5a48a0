use std::collections::BTreeMap;
use std::sync::Arc;

use super::catalog::ResourceCatalog;
use crate::content::{ArtifactSource, ContentSynchronizer};
use crate::tracker::Namespace;
use crate::transport::Transport;

/// Collaborators shared by every step of an install.
#[derive(Clone)]
pub struct DeployServices {
    pub transport: Arc<dyn Transport>,
    pub synchronizer: Arc<ContentSynchronizer>,
    pub catalog: Arc<ResourceCatalog>,
    /// Local artifacts per module namespace.
    pub module_sources: BTreeMap<Namespace, Arc<dyn ArtifactSource>>,
    /// Search options copied into each group's app server.
    pub query_options: Option<Arc<dyn ArtifactSource>>,
}

impl DeployServices {
    pub fn new(
        transport: Arc<dyn Transport>,
        synchronizer: Arc<ContentSynchronizer>,
        catalog: Arc<ResourceCatalog>,
    ) -> Self {
        Self {
            transport,
            synchronizer,
            catalog,
            module_sources: BTreeMap::new(),
            query_options: None,
        }
    }

    pub fn with_modules(mut self, namespace: Namespace, source: Arc<dyn ArtifactSource>) -> Self {
        self.module_sources.insert(namespace, source);
        self
    }

    pub fn with_query_options(mut self, source: Arc<dyn ArtifactSource>) -> Self {
        self.query_options = Some(source);
        self
    }
}
