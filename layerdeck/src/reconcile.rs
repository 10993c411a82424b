//! Style reconciliation.
//!
//! Swapping the base style drops every layer attached to the map surface.
//! Once the new style has loaded, the reconciler replays the registries onto
//! the surface in a fixed three-phase order, which is the z-order contract:
//!
//! 1. the base boundary layer (lowest)
//! 2. service layers, in insertion order
//! 3. data layers, in insertion order; label-overlay entries are re-rendered
//!    through the label path from their stored descriptor
//!
//! Each id is detached before it is re-attached, so replaying onto a surface
//! that still holds some of the layers also yields the contract order. A
//! failing entry is recorded in the report and the remaining entries are
//! still restored.

use tracing::{info, warn};

use crate::error::SurfaceError;
use crate::ids::LayerId;
use crate::registry::{LayerRegistry, LayerState};
use crate::service::ServiceLayerRegistry;
use crate::surface::MapSurface;

/// A layer that could not be restored.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileFailure {
    pub layer: LayerId,
    pub error: SurfaceError,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Ids restored on the surface, bottom to top.
    pub restored: Vec<LayerId>,
    /// Subset of `restored` that went through the label-overlay path.
    pub label_overlays: Vec<LayerId>,
    /// Entries that failed, in replay order.
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    /// Whether every entry was restored.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Replays the registries onto a freshly reset map surface.
#[derive(Debug, Clone, Copy)]
pub struct StyleReconciler<'a> {
    base: &'a LayerId,
}

impl<'a> StyleReconciler<'a> {
    /// Create a reconciler for the given base boundary layer id.
    pub fn new(base: &'a LayerId) -> Self {
        Self { base }
    }

    /// Run the three-phase replay.
    pub fn reconcile<S, L>(
        &self,
        surface: &mut S,
        services: &ServiceLayerRegistry<L>,
        layers: &LayerRegistry<L>,
    ) -> ReconcileReport
    where
        S: MapSurface + ?Sized,
    {
        let mut report = ReconcileReport::default();

        Self::reattach(surface, self.base, &mut report);

        for (id, entry) in services.iter() {
            if entry.layer.is_some() {
                Self::reattach(surface, id, &mut report);
            }
        }

        for (id, state) in layers.iter() {
            match state {
                LayerState::Rendered(_) => Self::reattach(surface, id, &mut report),
                LayerState::LabelOverlay(descriptor) => {
                    surface.detach_layer(id);
                    match surface.render_label_overlay(id, descriptor) {
                        Ok(()) => {
                            report.restored.push(id.clone());
                            report.label_overlays.push(id.clone());
                        }
                        Err(error) => {
                            warn!(layer = %id, error = %error, "Label overlay not restored");
                            report.failures.push(ReconcileFailure {
                                layer: id.clone(),
                                error,
                            });
                        }
                    }
                }
            }
        }

        info!(
            restored = report.restored.len(),
            labels = report.label_overlays.len(),
            failed = report.failures.len(),
            "Layer stack reconciled"
        );
        report
    }

    fn reattach<S>(surface: &mut S, id: &LayerId, report: &mut ReconcileReport)
    where
        S: MapSurface + ?Sized,
    {
        surface.detach_layer(id);
        match surface.attach_layer(id, None) {
            Ok(()) => report.restored.push(id.clone()),
            Err(error) => {
                warn!(layer = %id, error = %error, "Layer not restored");
                report.failures.push(ReconcileFailure {
                    layer: id.clone(),
                    error,
                });
            }
        }
    }
}
