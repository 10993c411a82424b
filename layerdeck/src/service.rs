//! Remote-service layer registry.
//!
//! Service layers come from a remote provider and have no module concept:
//! one service endpoint is one layer id. Entries are keyed directly by layer
//! id and kept in insertion order.

use indexmap::IndexMap;
use tracing::debug;

use crate::descriptor::ServiceDescriptor;
use crate::error::StackError;
use crate::factory::LayerFactory;
use crate::ids::LayerId;

/// Stored service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry<L> {
    /// Renderable object, `None` when the service has nothing to draw.
    pub layer: Option<L>,
    /// Last applied descriptor.
    pub descriptor: ServiceDescriptor,
}

/// Outcome of [`ServiceLayerRegistry::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChange {
    /// New service layer.
    Created { layer: LayerId, rendered: bool },
    /// Existing service layer updated in place.
    Updated {
        layer: LayerId,
        was_rendered: bool,
        rendered: bool,
    },
}

/// Registry of remote-service layers.
#[derive(Debug, Clone)]
pub struct ServiceLayerRegistry<L> {
    entries: IndexMap<LayerId, ServiceEntry<L>>,
}

impl<L> Default for ServiceLayerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> ServiceLayerRegistry<L> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add a service layer, or update it in place if the id is known.
    ///
    /// The factory runs first; an error leaves the registry untouched.
    pub fn upsert<F>(
        &mut self,
        factory: &mut F,
        layer: LayerId,
        descriptor: ServiceDescriptor,
    ) -> Result<ServiceChange, StackError>
    where
        F: LayerFactory<Layer = L>,
    {
        match self.entries.get(&layer) {
            Some(entry) => {
                let was_rendered = entry.layer.is_some();
                let built =
                    factory.update_service_layer(&layer, &descriptor, entry.layer.as_ref())?;
                let rendered = built.is_some();
                debug!(layer = %layer, rendered, "Service layer updated");

                self.entries.insert(
                    layer.clone(),
                    ServiceEntry {
                        layer: built,
                        descriptor,
                    },
                );
                Ok(ServiceChange::Updated {
                    layer,
                    was_rendered,
                    rendered,
                })
            }
            None => {
                let built = factory.create_service_layer(&layer, &descriptor)?;
                let rendered = built.is_some();
                debug!(layer = %layer, service = %descriptor.kind, rendered, "Service layer created");

                self.entries.insert(
                    layer.clone(),
                    ServiceEntry {
                        layer: built,
                        descriptor,
                    },
                );
                Ok(ServiceChange::Created { layer, rendered })
            }
        }
    }

    /// Remove a service layer. `None` if the id is unknown.
    pub fn remove(&mut self, layer: &LayerId) -> Option<ServiceEntry<L>> {
        let entry = self.entries.shift_remove(layer)?;
        debug!(layer = %layer, "Service layer removed");
        Some(entry)
    }

    /// Empty the registry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entry for a layer id.
    pub fn get(&self, layer: &LayerId) -> Option<&ServiceEntry<L>> {
        self.entries.get(layer)
    }

    /// Whether a layer id is registered.
    pub fn contains(&self, layer: &LayerId) -> bool {
        self.entries.contains_key(layer)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&LayerId, &ServiceEntry<L>)> {
        self.entries.iter()
    }

    /// Renderable objects in insertion order.
    pub fn rendered(&self) -> impl Iterator<Item = &L> {
        self.entries.values().filter_map(|e| e.layer.as_ref())
    }

    /// Layer ids in insertion order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
