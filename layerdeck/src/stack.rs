//! Layer stack façade.
//!
//! [`LayerStack`] owns the registries, the factory and the (optional) map
//! surface, and exposes the lifecycle operations hosts call: add/update/delete
//! for data and service layers, full reset, the per-frame render list and the
//! style-switch handshake.
//!
//! Every mutation updates the bookkeeping first and then funnels the
//! matching attach/detach to the surface, so the registries are the only
//! writer of the surface's layer list. Surface writes are best effort: a
//! rejected write is logged and the next reconciliation restores the surface
//! from the registries.
//!
//! # Example
//!
//! ```
//! use layerdeck::config::StackConfig;
//! use layerdeck::factory::DeckLayerFactory;
//! use layerdeck::surface::MemorySurface;
//! use layerdeck::{GeometryKind, LayerDescriptor, LayerId, LayerStack, ModuleId};
//!
//! let mut stack = LayerStack::new(StackConfig::default(), DeckLayerFactory::new()).unwrap();
//! stack.attach_surface(MemorySurface::new("light"));
//!
//! stack
//!     .add_or_update(
//!         ModuleId::from("m1"),
//!         LayerId::from("L1"),
//!         LayerDescriptor::new(GeometryKind::Point, "cities.csv"),
//!     )
//!     .unwrap();
//!
//! let ids: Vec<_> = stack.render_list().iter().map(|l| l.id.to_string()).collect();
//! assert_eq!(ids, ["national_boundary_line", "L1"]);
//! ```

use tracing::{debug, info, warn};

use crate::config::StackConfig;
use crate::descriptor::{LayerDescriptor, ServiceDescriptor};
use crate::error::{StackError, SurfaceError};
use crate::factory::LayerFactory;
use crate::ids::{LayerId, ModuleId};
use crate::reconcile::{ReconcileReport, StyleReconciler};
use crate::registry::{LayerChange, LayerRegistry, LayerState};
use crate::render::render_list;
use crate::service::{ServiceChange, ServiceLayerRegistry};
use crate::surface::MapSurface;

/// Registries, factory and map surface behind one set of lifecycle operations.
pub struct LayerStack<F: LayerFactory, S> {
    config: StackConfig,
    factory: F,
    surface: Option<S>,
    base: F::Layer,
    layers: LayerRegistry<F::Layer>,
    services: ServiceLayerRegistry<F::Layer>,
    pending_style: Option<String>,
}

impl<F, S> LayerStack<F, S>
where
    F: LayerFactory,
    S: MapSurface,
{
    /// Create a stack and build its base boundary layer.
    ///
    /// # Errors
    ///
    /// - [`StackError::Factory`] if the base layer cannot be built
    /// - [`StackError::BaseLayerNotRenderable`] if the factory routes the
    ///   base descriptor to the label overlay
    pub fn new(config: StackConfig, mut factory: F) -> Result<Self, StackError> {
        let base_id = config.base_layer.id.clone();
        let base = factory
            .create_layer(&base_id, &config.base_layer.descriptor())?
            .ok_or(StackError::BaseLayerNotRenderable(base_id))?;

        Ok(Self {
            config,
            factory,
            surface: None,
            base,
            layers: LayerRegistry::new(),
            services: ServiceLayerRegistry::new(),
            pending_style: None,
        })
    }

    /// Install the map surface once the base map has loaded.
    ///
    /// Everything already registered is replayed onto it, base layer first.
    pub fn attach_surface(&mut self, surface: S) -> ReconcileReport {
        info!(base = %self.config.base_layer.id, "Map surface attached");
        let surface = self.surface.insert(surface);
        StyleReconciler::new(&self.config.base_layer.id).reconcile(
            surface,
            &self.services,
            &self.layers,
        )
    }

    /// Remove and return the map surface.
    pub fn detach_surface(&mut self) -> Option<S> {
        self.pending_style = None;
        self.surface.take()
    }

    // === Data layers ===

    /// Add, update or replace the layer of a data module.
    ///
    /// See [`LayerRegistry::upsert`] for the decision tree. Surface effects:
    ///
    /// - create: attach (or render the label overlay)
    /// - update: untouched while the layer stays rendered; a switch between
    ///   rendered and label-overlay state swaps the attachment
    /// - replace: the old id is always detached, then the new one attached
    pub fn add_or_update(
        &mut self,
        module: ModuleId,
        layer: LayerId,
        descriptor: LayerDescriptor,
    ) -> Result<LayerChange, StackError> {
        self.check_layer_id(&layer, Registry::Data)?;
        let change = self
            .layers
            .upsert(&mut self.factory, module, layer, descriptor)?;

        match &change {
            LayerChange::Created { layer, .. } => self.show_data_layer(layer),
            LayerChange::Updated {
                layer,
                was_rendered,
                rendered,
            } => match (*was_rendered, *rendered) {
                (true, true) => {}
                (true, false) | (false, true) => {
                    self.hide(layer);
                    self.show_data_layer(layer);
                }
                (false, false) => self.show_data_layer(layer),
            },
            LayerChange::Replaced { old, new, .. } => {
                self.hide(old);
                self.show_data_layer(new);
            }
        }
        Ok(change)
    }

    /// Delete the layer of a data module. Returns `false` for unknown ids.
    pub fn delete_module(&mut self, module: &ModuleId) -> bool {
        match self.layers.remove_module(module) {
            Some(removed) => {
                self.hide(&removed.layer);
                true
            }
            None => {
                debug!(module = %module, "Delete of unknown module ignored");
                false
            }
        }
    }

    /// Delete a data layer by layer id. Returns `false` for unknown ids.
    pub fn delete_layer(&mut self, layer: &LayerId) -> bool {
        match self.layers.remove_layer(layer) {
            Some(removed) => {
                self.hide(&removed.layer);
                true
            }
            None => {
                debug!(layer = %layer, "Delete of unknown layer ignored");
                false
            }
        }
    }

    /// Delete every module whose current descriptor references `source`.
    ///
    /// Returns the deleted modules in registration order.
    pub fn delete_source(&mut self, source: &str) -> Vec<ModuleId> {
        let modules = self.layers.modules_for_source(source);
        for module in &modules {
            self.delete_module(module);
        }
        info!(source, count = modules.len(), "Deleted layers for source");
        modules
    }

    /// Full session reset.
    ///
    /// Detaches every known layer from the surface, cancels a pending style
    /// switch and empties both registries. The base layer stays.
    pub fn clear(&mut self) {
        self.pending_style = None;
        if let Some(surface) = self.surface.as_mut() {
            for id in self.layers.layer_ids() {
                surface.detach_layer(&id);
            }
            for id in self.services.layer_ids() {
                surface.detach_layer(&id);
            }
        }
        self.layers.clear();
        self.services.clear();
        info!("Layer stack cleared");
    }

    // === Service layers ===

    /// Add a service layer, or update it in place.
    ///
    /// New service layers are attached beneath the configured preload anchor
    /// when the anchor is on the surface, and on top otherwise.
    pub fn add_or_update_service(
        &mut self,
        layer: LayerId,
        descriptor: ServiceDescriptor,
    ) -> Result<ServiceChange, StackError> {
        self.check_layer_id(&layer, Registry::Service)?;
        let change = self.services.upsert(&mut self.factory, layer, descriptor)?;

        match &change {
            ServiceChange::Created { layer, rendered } => {
                if *rendered {
                    self.attach_service(layer);
                }
            }
            ServiceChange::Updated {
                layer,
                was_rendered,
                rendered,
            } => match (*was_rendered, *rendered) {
                (false, true) => self.attach_service(layer),
                (true, false) => self.hide(layer),
                _ => {}
            },
        }
        Ok(change)
    }

    /// Delete a service layer. Returns `false` for unknown ids.
    pub fn delete_service(&mut self, layer: &LayerId) -> bool {
        let known = self.services.remove(layer).is_some();
        self.hide(layer);
        known
    }

    // === Rendering ===

    /// Draw list for the rendering engine: base, data layers, service layers.
    pub fn render_list(&self) -> Vec<&F::Layer> {
        render_list(&self.base, &self.layers, &self.services)
    }

    /// Swap the base map style.
    ///
    /// The surface drops its layers; call [`on_style_switched`] once the new
    /// style has loaded to restore them.
    ///
    /// [`on_style_switched`]: Self::on_style_switched
    pub fn switch_style(&mut self, style: &str) -> Result<(), StackError> {
        let surface = self.surface.as_mut().ok_or(StackError::NoSurface)?;
        info!(style, "Switching map style");
        surface.set_style(style);
        self.pending_style = Some(style.to_string());
        Ok(())
    }

    /// Style-data-ready hook.
    ///
    /// Runs the reconciler once per pending style switch. Ready signals with
    /// no switch pending return `None`.
    pub fn on_style_switched(&mut self) -> Option<ReconcileReport> {
        let style = self.pending_style.take()?;
        let surface = self.surface.as_mut()?;
        debug!(style = %style, "Style loaded, reconciling");
        Some(
            StyleReconciler::new(&self.config.base_layer.id).reconcile(
                surface,
                &self.services,
                &self.layers,
            ),
        )
    }

    /// Whether a style switch is waiting for its ready signal.
    pub fn style_switch_pending(&self) -> bool {
        self.pending_style.is_some()
    }

    // === Accessors ===

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Base boundary layer object.
    pub fn base_layer(&self) -> &F::Layer {
        &self.base
    }

    /// Data-layer registry.
    pub fn registry(&self) -> &LayerRegistry<F::Layer> {
        &self.layers
    }

    /// Service-layer registry.
    pub fn services(&self) -> &ServiceLayerRegistry<F::Layer> {
        &self.services
    }

    pub fn layer_for_module(&self, module: &ModuleId) -> Option<&LayerId> {
        self.layers.layer_for_module(module)
    }

    pub fn layer_state(&self, layer: &LayerId) -> Option<&LayerState<F::Layer>> {
        self.layers.state(layer)
    }

    pub fn descriptor(&self, layer: &LayerId) -> Option<&LayerDescriptor> {
        self.layers.descriptor(layer)
    }

    pub fn module_count(&self) -> usize {
        self.layers.module_count()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    // === Surface writes ===

    /// The surface has one id namespace shared by the base layer and both
    /// registries; an id may only be claimed from one of them.
    fn check_layer_id(&self, layer: &LayerId, target: Registry) -> Result<(), StackError> {
        if layer.is_empty() {
            return Err(StackError::EmptyLayerId);
        }
        let owner = if *layer == self.config.base_layer.id {
            Some("base layer")
        } else {
            match target {
                Registry::Data if self.services.contains(layer) => Some("service registry"),
                Registry::Service if self.layers.state(layer).is_some() => Some("data registry"),
                _ => None,
            }
        };
        match owner {
            Some(owner) => {
                debug!(layer = %layer, owner, "Layer id rejected");
                Err(StackError::ReservedId {
                    layer: layer.clone(),
                    owner,
                })
            }
            None => Ok(()),
        }
    }

    fn show_data_layer(&mut self, layer: &LayerId) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let result = match self.layers.state(layer) {
            Some(LayerState::Rendered(_)) => surface.attach_layer(layer, None),
            Some(LayerState::LabelOverlay(descriptor)) => {
                surface.render_label_overlay(layer, descriptor)
            }
            None => Ok(()),
        };
        log_surface_error(layer, result);
    }

    fn attach_service(&mut self, layer: &LayerId) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let anchor = self
            .config
            .services
            .preload_anchor
            .as_ref()
            .filter(|anchor| surface.has_layer(anchor));
        log_surface_error(layer, surface.attach_layer(layer, anchor));
    }

    fn hide(&mut self, layer: &LayerId) {
        if let Some(surface) = self.surface.as_mut() {
            if !surface.detach_layer(layer) {
                debug!(layer = %layer, "Layer was not attached");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Registry {
    Data,
    Service,
}

fn log_surface_error(layer: &LayerId, result: Result<(), SurfaceError>) {
    if let Err(error) = result {
        warn!(layer = %layer, error = %error, "Map surface rejected layer");
    }
}

impl<F, S> std::fmt::Debug for LayerStack<F, S>
where
    F: LayerFactory,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack")
            .field("base", &self.config.base_layer.id)
            .field("layers", &self.layers.layer_ids())
            .field("services", &self.services.layer_ids())
            .field("surface_attached", &self.surface.is_some())
            .field("pending_style", &self.pending_style)
            .finish()
    }
}
