//! Data-layer registry.
//!
//! Owns the three bookkeeping maps for module-backed layers:
//!
//! ```text
//! modules:  ModuleId ──► LayerId            (partial injection)
//! layers:   LayerId  ──► LayerState<L>      (insertion-ordered)
//! options:  LayerId  ──► LayerDescriptor    (last applied descriptor)
//! owners:   LayerId  ──► ModuleId           (inverse of `modules`)
//! ```
//!
//! The registry is pure bookkeeping: it calls the factory and reports what
//! changed as a [`LayerChange`], leaving map-surface writes to the caller.
//! After every mutation:
//!
//! 1. distinct modules map to distinct layer ids, and every mapped layer id
//!    has an entry in `layers`
//! 2. every key of `layers` has a descriptor in `options`

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::descriptor::LayerDescriptor;
use crate::error::StackError;
use crate::factory::LayerFactory;
use crate::ids::{LayerId, ModuleId};

/// Stored state of a data layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerState<L> {
    /// Drawn by the rendering engine.
    Rendered(L),
    /// Drawn by the map surface's label-overlay path from this descriptor.
    LabelOverlay(LayerDescriptor),
}

impl<L> LayerState<L> {
    /// Wrap a factory result.
    pub fn from_built(built: Option<L>, descriptor: &LayerDescriptor) -> Self {
        match built {
            Some(layer) => LayerState::Rendered(layer),
            None => LayerState::LabelOverlay(descriptor.clone()),
        }
    }

    /// The renderable object, if any.
    pub fn rendered(&self) -> Option<&L> {
        match self {
            LayerState::Rendered(layer) => Some(layer),
            LayerState::LabelOverlay(_) => None,
        }
    }

    /// Whether this layer is drawn by the rendering engine.
    pub fn is_rendered(&self) -> bool {
        matches!(self, LayerState::Rendered(_))
    }
}

/// Outcome of [`LayerRegistry::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerChange {
    /// First add for the module.
    Created { layer: LayerId, rendered: bool },
    /// Same module, same layer id: updated in place.
    Updated {
        layer: LayerId,
        was_rendered: bool,
        rendered: bool,
    },
    /// Same module, new layer id: the old entry was removed.
    Replaced {
        old: LayerId,
        new: LayerId,
        was_rendered: bool,
        rendered: bool,
    },
}

/// An entry removed from the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedLayer<L> {
    pub module: ModuleId,
    pub layer: LayerId,
    pub state: LayerState<L>,
}

/// Registry of module-backed data layers.
#[derive(Debug, Clone)]
pub struct LayerRegistry<L> {
    modules: IndexMap<ModuleId, LayerId>,
    layers: IndexMap<LayerId, LayerState<L>>,
    options: HashMap<LayerId, LayerDescriptor>,
    owners: HashMap<LayerId, ModuleId>,
}

impl<L> Default for LayerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> LayerRegistry<L> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            modules: IndexMap::new(),
            layers: IndexMap::new(),
            options: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Add or update the layer for a module.
    ///
    /// - unknown module: **create** `layer` and append it
    /// - module already on `layer`: **update** in place via the factory
    /// - module on a different layer: **replace**, the new id takes the old
    ///   id's position
    ///
    /// The factory runs before any bookkeeping changes, so an error leaves the
    /// registry untouched. A layer id owned by another module is rejected with
    /// [`StackError::LayerInUse`].
    pub fn upsert<F>(
        &mut self,
        factory: &mut F,
        module: ModuleId,
        layer: LayerId,
        descriptor: LayerDescriptor,
    ) -> Result<LayerChange, StackError>
    where
        F: LayerFactory<Layer = L>,
    {
        if let Some(owner) = self.module_for_layer(&layer) {
            if owner != &module {
                return Err(StackError::LayerInUse {
                    layer,
                    owner: owner.clone(),
                });
            }
        }

        let current = self.modules.get(&module).cloned();
        match current {
            None => {
                let built = factory.create_layer(&layer, &descriptor)?;
                let state = LayerState::from_built(built, &descriptor);
                let rendered = state.is_rendered();
                debug!(module = %module, layer = %layer, rendered, "Layer created");

                self.owners.insert(layer.clone(), module.clone());
                self.modules.insert(module, layer.clone());
                self.layers.insert(layer.clone(), state);
                self.options.insert(layer.clone(), descriptor);
                Ok(LayerChange::Created { layer, rendered })
            }
            Some(existing) if existing == layer => {
                let was_rendered = self
                    .layers
                    .get(&layer)
                    .is_some_and(LayerState::is_rendered);
                let previous = self.layers.get(&layer).and_then(LayerState::rendered);
                let built = factory.update_layer(&layer, &descriptor, previous)?;
                let state = LayerState::from_built(built, &descriptor);
                let rendered = state.is_rendered();
                debug!(module = %module, layer = %layer, rendered, "Layer updated in place");

                self.layers.insert(layer.clone(), state);
                self.options.insert(layer.clone(), descriptor);
                Ok(LayerChange::Updated {
                    layer,
                    was_rendered,
                    rendered,
                })
            }
            Some(old) => {
                let built = factory.create_layer(&layer, &descriptor)?;
                let state = LayerState::from_built(built, &descriptor);
                let rendered = state.is_rendered();

                let (index, was_rendered) = match self.layers.shift_remove_full(&old) {
                    Some((index, _, old_state)) => (index, old_state.is_rendered()),
                    None => (self.layers.len(), false),
                };
                self.options.remove(&old);
                self.owners.remove(&old);
                self.owners.insert(layer.clone(), module.clone());
                self.modules.insert(module.clone(), layer.clone());
                self.layers.shift_insert(index, layer.clone(), state);
                self.options.insert(layer.clone(), descriptor);
                debug!(
                    module = %module,
                    old = %old,
                    new = %layer,
                    rendered,
                    "Layer replaced"
                );

                Ok(LayerChange::Replaced {
                    old,
                    new: layer,
                    was_rendered,
                    rendered,
                })
            }
        }
    }

    /// Remove a module and its layer. `None` if the module is unknown.
    pub fn remove_module(&mut self, module: &ModuleId) -> Option<RemovedLayer<L>> {
        let layer = self.modules.shift_remove(module)?;
        self.owners.remove(&layer);
        self.options.remove(&layer);
        let state = self.layers.shift_remove(&layer)?;
        debug!(module = %module, layer = %layer, "Layer removed");
        Some(RemovedLayer {
            module: module.clone(),
            layer,
            state,
        })
    }

    /// Remove a layer and the module bound to it. `None` if the id is unknown.
    pub fn remove_layer(&mut self, layer: &LayerId) -> Option<RemovedLayer<L>> {
        let module = self.module_for_layer(layer)?.clone();
        self.remove_module(&module)
    }

    /// Empty all maps.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.layers.clear();
        self.options.clear();
        self.owners.clear();
    }

    /// Layer id currently bound to a module.
    pub fn layer_for_module(&self, module: &ModuleId) -> Option<&LayerId> {
        self.modules.get(module)
    }

    /// Module bound to a layer id.
    pub fn module_for_layer(&self, layer: &LayerId) -> Option<&ModuleId> {
        self.owners.get(layer)
    }

    /// Stored state for a layer id.
    pub fn state(&self, layer: &LayerId) -> Option<&LayerState<L>> {
        self.layers.get(layer)
    }

    /// Last applied descriptor for a layer id.
    pub fn descriptor(&self, layer: &LayerId) -> Option<&LayerDescriptor> {
        self.options.get(layer)
    }

    /// Layers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&LayerId, &LayerState<L>)> {
        self.layers.iter()
    }

    /// Renderable objects in insertion order, skipping label overlays.
    pub fn rendered(&self) -> impl Iterator<Item = &L> {
        self.layers.values().filter_map(LayerState::rendered)
    }

    /// Layer ids in insertion order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().cloned().collect()
    }

    /// Snapshot of the modules whose current descriptor references `source`.
    pub fn modules_for_source(&self, source: &str) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|(_, layer)| {
                self.options
                    .get(*layer)
                    .is_some_and(|d| d.source == source)
            })
            .map(|(module, _)| module.clone())
            .collect()
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Check the bookkeeping invariants.
    ///
    /// Returns a description of the first violation found.
    pub fn verify_invariants(&self) -> Result<(), String> {
        let mut seen: HashMap<&LayerId, &ModuleId> = HashMap::new();
        for (module, layer) in &self.modules {
            if let Some(other) = seen.insert(layer, module) {
                return Err(format!(
                    "modules {} and {} both map to layer {}",
                    other, module, layer
                ));
            }
            if self.owners.get(layer) != Some(module) {
                return Err(format!("layer {} is not owned by module {}", layer, module));
            }
            if !self.layers.contains_key(layer) {
                return Err(format!("layer {} of module {} is missing", layer, module));
            }
        }
        for layer in self.layers.keys() {
            if !self.options.contains_key(layer) {
                return Err(format!("layer {} has no descriptor", layer));
            }
        }
        if self.owners.len() != self.modules.len() {
            return Err(format!(
                "{} owners for {} modules",
                self.owners.len(),
                self.modules.len()
            ));
        }
        if self.options.len() != self.layers.len() {
            return Err(format!(
                "{} descriptors for {} layers",
                self.options.len(),
                self.layers.len()
            ));
        }
        Ok(())
    }
}
