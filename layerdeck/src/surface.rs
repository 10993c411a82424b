//! Map surface abstraction.
//!
//! The map surface is the base-map provider's attached-layer list: the one
//! shared mutable resource outside the registries. Layers rendered by the
//! engine are attached by id; label overlays are rendered natively by the
//! surface under the same id. Switching the style is destructive: the surface
//! rebuilds its layer list from scratch and everything must be re-attached.
//!
//! [`MemorySurface`] is an in-process implementation that keeps the ordered
//! stack, used by the CLI host and by tests to assert z-order structurally.

use std::collections::HashSet;

use crate::descriptor::LayerDescriptor;
use crate::error::SurfaceError;
use crate::ids::LayerId;

/// Attached-layer list of the base map.
pub trait MapSurface {
    /// Attach a layer by id.
    ///
    /// With `before`, the layer is inserted directly beneath that layer;
    /// otherwise it is appended at the top.
    fn attach_layer(&mut self, id: &LayerId, before: Option<&LayerId>) -> Result<(), SurfaceError>;

    /// Detach a layer by id.
    ///
    /// Returns `false` when the id was not attached. Never fails: layers may
    /// already have been removed out of band.
    fn detach_layer(&mut self, id: &LayerId) -> bool;

    /// Whether a layer with this id is currently attached.
    fn has_layer(&self, id: &LayerId) -> bool;

    /// Render a descriptor through the label-overlay path under `id`.
    ///
    /// Rendering again under an id that already carries a label replaces it
    /// in place.
    fn render_label_overlay(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
    ) -> Result<(), SurfaceError>;

    /// Swap the base style. Drops every attached layer.
    fn set_style(&mut self, style: &str);
}

/// How a layer is attached to the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceLayerKind {
    /// Proxy for a layer drawn by the rendering engine.
    Engine,
    /// Natively rendered label overlay.
    Label {
        /// Data source the labels were rendered from.
        source: String,
    },
}

/// One entry of the [`MemorySurface`] stack.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayer {
    pub id: LayerId,
    pub kind: SurfaceLayerKind,
}

/// In-memory map surface.
///
/// The stack is ordered bottom to top.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    style: String,
    layers: Vec<SurfaceLayer>,
    style_loads: u64,
    unresolvable: HashSet<String>,
}

impl MemorySurface {
    /// Create a surface showing `style`.
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            ..Self::default()
        }
    }

    /// Current style.
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Number of times the style has been swapped.
    pub fn style_loads(&self) -> u64 {
        self.style_loads
    }

    /// Attached layers, bottom to top.
    pub fn layers(&self) -> &[SurfaceLayer] {
        &self.layers
    }

    /// Attached layer ids, bottom to top.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    /// Ids of attached label overlays, bottom to top.
    pub fn label_ids(&self) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, SurfaceLayerKind::Label { .. }))
            .map(|l| l.id.clone())
            .collect()
    }

    /// Make label rendering fail for descriptors referencing `source`.
    ///
    /// Simulates a data source that can no longer be resolved.
    pub fn mark_unresolvable(&mut self, source: impl Into<String>) {
        self.unresolvable.insert(source.into());
    }

    fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    fn insert(&mut self, layer: SurfaceLayer, before: Option<&LayerId>) -> Result<(), SurfaceError> {
        if self.position(&layer.id).is_some() {
            return Err(SurfaceError::DuplicateLayer(layer.id));
        }
        match before {
            Some(anchor) => {
                let index = self
                    .position(anchor)
                    .ok_or_else(|| SurfaceError::UnknownAnchor(anchor.clone()))?;
                self.layers.insert(index, layer);
            }
            None => self.layers.push(layer),
        }
        Ok(())
    }
}

impl MapSurface for MemorySurface {
    fn attach_layer(&mut self, id: &LayerId, before: Option<&LayerId>) -> Result<(), SurfaceError> {
        self.insert(
            SurfaceLayer {
                id: id.clone(),
                kind: SurfaceLayerKind::Engine,
            },
            before,
        )
    }

    fn detach_layer(&mut self, id: &LayerId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.layers.remove(index);
                true
            }
            None => false,
        }
    }

    fn has_layer(&self, id: &LayerId) -> bool {
        self.position(id).is_some()
    }

    fn render_label_overlay(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
    ) -> Result<(), SurfaceError> {
        if self.unresolvable.contains(&descriptor.source) {
            return Err(SurfaceError::LabelOverlay {
                layer: id.clone(),
                reason: format!("cannot resolve source '{}'", descriptor.source),
            });
        }

        let kind = SurfaceLayerKind::Label {
            source: descriptor.source.clone(),
        };
        match self.position(id) {
            Some(index) => match self.layers[index].kind {
                SurfaceLayerKind::Label { .. } => {
                    self.layers[index].kind = kind;
                    Ok(())
                }
                SurfaceLayerKind::Engine => Err(SurfaceError::DuplicateLayer(id.clone())),
            },
            None => {
                self.layers.push(SurfaceLayer {
                    id: id.clone(),
                    kind,
                });
                Ok(())
            }
        }
    }

    fn set_style(&mut self, style: &str) {
        self.style = style.to_string();
        self.layers.clear();
        self.style_loads += 1;
    }
}
