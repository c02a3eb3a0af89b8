use std::collections::BTreeMap;
use std::sync::Arc;

use qsb_core::{ErrorInfo, QsbError};

use crate::direct::{DirectGrouped, DirectNaive, DirectOptimized};
use crate::protocol::{Protocol, ProtocolOptions};
use crate::randomized::ClassicalShadows;

/// Explicit lookup table from protocol id to implementation.
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    entries: BTreeMap<String, Arc<dyn Protocol>>,
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ProtocolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four built-in protocols configured with `options`.
    pub fn with_defaults(options: &ProtocolOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DirectNaive::new(options.clone())));
        registry.register(Arc::new(DirectGrouped::new(options.clone())));
        registry.register(Arc::new(DirectOptimized::new(options.clone())));
        registry.register(Arc::new(ClassicalShadows::new(options.clone())));
        registry
    }

    /// Adds or replaces a protocol under its own id.
    pub fn register(&mut self, protocol: Arc<dyn Protocol>) {
        self.entries.insert(protocol.id().to_string(), protocol);
    }

    /// Looks up a protocol, failing on unknown ids.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Protocol>, QsbError> {
        self.entries.get(id).cloned().ok_or_else(|| {
            QsbError::Config(
                ErrorInfo::new("unknown-protocol", "protocol id is not registered")
                    .with_context("protocol", id)
                    .with_hint(format!("registered: {}", self.ids().join(", "))),
            )
        })
    }

    /// True when `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
