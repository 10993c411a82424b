//! Layer factory abstraction.
//!
//! The factory turns descriptors into renderable layer objects for the
//! rendering engine. Payload construction itself (geometry processing,
//! shading, service metadata) is the factory's business; the registries only
//! store what it returns.
//!
//! # Renderable vs. label overlay
//!
//! A factory returns `Ok(None)` when a data descriptor should render through
//! the map surface's label-overlay path instead of the rendering engine. This
//! is a first-class state, not an error. `Err` means construction failed and
//! the caller must leave its bookkeeping untouched.
//!
//! # Example
//!
//! ```
//! use layerdeck::factory::{DeckLayerFactory, LayerFactory};
//! use layerdeck::{GeometryKind, LayerDescriptor, LayerId};
//!
//! let mut factory = DeckLayerFactory::new();
//! let id = LayerId::from("L1");
//!
//! let layer = factory
//!     .create_layer(&id, &LayerDescriptor::new(GeometryKind::Point, "cities.csv"))
//!     .unwrap();
//! assert!(layer.is_some());
//!
//! let label = factory
//!     .create_layer(&id, &LayerDescriptor::new(GeometryKind::Text, "cities.csv"))
//!     .unwrap();
//! assert!(label.is_none());
//! ```

use crate::descriptor::{GeometryKind, LayerDescriptor, ServiceDescriptor, ServiceKind};
use crate::error::FactoryError;
use crate::ids::LayerId;

/// Builds and updates renderable layer objects.
///
/// Calls are synchronous and CPU-only; any data fetching has already happened
/// before a descriptor reaches the factory.
pub trait LayerFactory {
    /// Renderable layer object handed to the rendering engine.
    type Layer;

    /// Build a data layer.
    ///
    /// Returns `Ok(None)` when the descriptor renders via the label overlay.
    fn create_layer(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
    ) -> Result<Option<Self::Layer>, FactoryError>;

    /// Update an existing data layer with a new descriptor.
    ///
    /// `previous` is the currently stored object, or `None` when the layer is
    /// in the label-overlay state. The factory decides whether the previous
    /// object can be mutated or must be rebuilt.
    fn update_layer(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
        previous: Option<&Self::Layer>,
    ) -> Result<Option<Self::Layer>, FactoryError>;

    /// Build a remote-service layer.
    ///
    /// Returns `Ok(None)` when the service currently has nothing to draw.
    fn create_service_layer(
        &mut self,
        id: &LayerId,
        descriptor: &ServiceDescriptor,
    ) -> Result<Option<Self::Layer>, FactoryError>;

    /// Update an existing remote-service layer.
    fn update_service_layer(
        &mut self,
        id: &LayerId,
        descriptor: &ServiceDescriptor,
        previous: Option<&Self::Layer>,
    ) -> Result<Option<Self::Layer>, FactoryError>;
}

/// What a [`DeckLayer`] draws.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckLayerKind {
    /// Data layer of the given geometry kind.
    Geometry(GeometryKind),
    /// Remote service layer.
    Service(ServiceKind),
}

/// Renderable layer record produced by [`DeckLayerFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeckLayer {
    /// Layer id this object was built for.
    pub id: LayerId,
    /// What the layer draws.
    pub kind: DeckLayerKind,
    /// Data source or service URL.
    pub source: String,
    pub visible: bool,
    pub opacity: f32,
    /// Incremented on every in-place update, reset to 0 on rebuild.
    pub revision: u64,
}

/// Reference factory that produces [`DeckLayer`] records.
///
/// - `text` descriptors take the label-overlay path (`Ok(None)`)
/// - a data descriptor without a source is rejected
/// - a service URL must be `http://` or `https://`
/// - an update keeps the previous object when the geometry kind is unchanged
///   and bumps its revision; otherwise the layer is rebuilt
#[derive(Debug, Default)]
pub struct DeckLayerFactory {
    built: u64,
}

impl DeckLayerFactory {
    /// Create a new factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layer objects built from scratch so far.
    pub fn built_count(&self) -> u64 {
        self.built
    }

    fn build_geometry(&mut self, id: &LayerId, descriptor: &LayerDescriptor) -> DeckLayer {
        self.built += 1;
        DeckLayer {
            id: id.clone(),
            kind: DeckLayerKind::Geometry(descriptor.kind),
            source: descriptor.source.clone(),
            visible: descriptor.visible,
            opacity: descriptor.opacity,
            revision: 0,
        }
    }

    fn validate_service(id: &LayerId, descriptor: &ServiceDescriptor) -> Result<(), FactoryError> {
        let url = descriptor.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FactoryError::InvalidService {
                layer: id.clone(),
                reason: format!("unsupported URL '{}'", descriptor.url),
            });
        }
        if descriptor.kind == ServiceKind::Wms && descriptor.layers.is_empty() {
            return Err(FactoryError::InvalidService {
                layer: id.clone(),
                reason: "WMS services need at least one layer name".to_string(),
            });
        }
        Ok(())
    }
}

impl LayerFactory for DeckLayerFactory {
    type Layer = DeckLayer;

    fn create_layer(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
    ) -> Result<Option<DeckLayer>, FactoryError> {
        if descriptor.source.trim().is_empty() {
            return Err(FactoryError::MissingSource(id.clone()));
        }
        if descriptor.kind.is_label() {
            return Ok(None);
        }
        Ok(Some(self.build_geometry(id, descriptor)))
    }

    fn update_layer(
        &mut self,
        id: &LayerId,
        descriptor: &LayerDescriptor,
        previous: Option<&DeckLayer>,
    ) -> Result<Option<DeckLayer>, FactoryError> {
        match previous {
            Some(prev)
                if prev.kind == DeckLayerKind::Geometry(descriptor.kind)
                    && !descriptor.source.trim().is_empty() =>
            {
                Ok(Some(DeckLayer {
                    source: descriptor.source.clone(),
                    visible: descriptor.visible,
                    opacity: descriptor.opacity,
                    revision: prev.revision + 1,
                    ..prev.clone()
                }))
            }
            _ => self.create_layer(id, descriptor),
        }
    }

    fn create_service_layer(
        &mut self,
        id: &LayerId,
        descriptor: &ServiceDescriptor,
    ) -> Result<Option<DeckLayer>, FactoryError> {
        Self::validate_service(id, descriptor)?;
        self.built += 1;
        Ok(Some(DeckLayer {
            id: id.clone(),
            kind: DeckLayerKind::Service(descriptor.kind),
            source: descriptor.url.clone(),
            visible: descriptor.visible,
            opacity: descriptor.opacity,
            revision: 0,
        }))
    }

    fn update_service_layer(
        &mut self,
        id: &LayerId,
        descriptor: &ServiceDescriptor,
        previous: Option<&DeckLayer>,
    ) -> Result<Option<DeckLayer>, FactoryError> {
        Self::validate_service(id, descriptor)?;
        match previous {
            Some(prev) if prev.kind == DeckLayerKind::Service(descriptor.kind) => {
                Ok(Some(DeckLayer {
                    source: descriptor.url.clone(),
                    visible: descriptor.visible,
                    opacity: descriptor.opacity,
                    revision: prev.revision + 1,
                    ..prev.clone()
                }))
            }
            _ => self.create_service_layer(id, descriptor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(source: &str) -> LayerDescriptor {
        LayerDescriptor::new(GeometryKind::Point, source)
    }

    #[test]
    fn test_create_geometry_layer() {
        let mut factory = DeckLayerFactory::new();
        let layer = factory
            .create_layer(&LayerId::from("L1"), &point("cities.csv"))
            .unwrap()
            .expect("point layers are renderable");

        assert_eq!(layer.id, LayerId::from("L1"));
        assert_eq!(layer.kind, DeckLayerKind::Geometry(GeometryKind::Point));
        assert_eq!(layer.revision, 0);
        assert_eq!(factory.built_count(), 1);
    }

    #[test]
    fn test_text_layer_takes_label_path() {
        let mut factory = DeckLayerFactory::new();
        let layer = factory
            .create_layer(
                &LayerId::from("L1"),
                &LayerDescriptor::new(GeometryKind::Text, "names.csv"),
            )
            .unwrap();
        assert!(layer.is_none());
        assert_eq!(factory.built_count(), 0);
    }

    #[test]
    fn test_missing_source_rejected() {
        let mut factory = DeckLayerFactory::new();
        let err = factory
            .create_layer(&LayerId::from("L1"), &point("  "))
            .unwrap_err();
        assert_eq!(err, FactoryError::MissingSource(LayerId::from("L1")));
    }

    #[test]
    fn test_update_same_kind_mutates_in_place() {
        let mut factory = DeckLayerFactory::new();
        let id = LayerId::from("L1");
        let first = factory.create_layer(&id, &point("a.csv")).unwrap().unwrap();

        let updated = factory
            .update_layer(&id, &point("a.csv").with_opacity(0.5), Some(&first))
            .unwrap()
            .unwrap();

        assert_eq!(updated.revision, 1);
        assert_eq!(updated.opacity, 0.5);
        assert_eq!(factory.built_count(), 1, "no rebuild for same kind");
    }

    #[test]
    fn test_update_kind_change_rebuilds() {
        let mut factory = DeckLayerFactory::new();
        let id = LayerId::from("L1");
        let first = factory.create_layer(&id, &point("a.csv")).unwrap().unwrap();

        let rebuilt = factory
            .update_layer(
                &id,
                &LayerDescriptor::new(GeometryKind::Heatmap, "a.csv"),
                Some(&first),
            )
            .unwrap()
            .unwrap();

        assert_eq!(rebuilt.revision, 0);
        assert_eq!(rebuilt.kind, DeckLayerKind::Geometry(GeometryKind::Heatmap));
        assert_eq!(factory.built_count(), 2);
    }

    #[test]
    fn test_update_from_label_state_builds() {
        let mut factory = DeckLayerFactory::new();
        let layer = factory
            .update_layer(&LayerId::from("L1"), &point("a.csv"), None)
            .unwrap();
        assert!(layer.is_some());
    }

    #[test]
    fn test_service_url_validation() {
        let mut factory = DeckLayerFactory::new();
        let id = LayerId::from("S1");

        let bad = ServiceDescriptor::new(ServiceKind::Xyz, "ftp://tiles.example.com");
        assert!(matches!(
            factory.create_service_layer(&id, &bad),
            Err(FactoryError::InvalidService { .. })
        ));

        let wms_without_layers = ServiceDescriptor::new(ServiceKind::Wms, "https://example.com/wms");
        assert!(factory.create_service_layer(&id, &wms_without_layers).is_err());

        let good = ServiceDescriptor::new(ServiceKind::Wms, "https://example.com/wms")
            .with_layer("roads");
        let layer = factory.create_service_layer(&id, &good).unwrap().unwrap();
        assert_eq!(layer.kind, DeckLayerKind::Service(ServiceKind::Wms));
    }

    #[test]
    fn test_service_update_bumps_revision() {
        let mut factory = DeckLayerFactory::new();
        let id = LayerId::from("S1");
        let d = ServiceDescriptor::new(ServiceKind::Xyz, "https://tiles.example.com/{z}/{x}/{y}");
        let first = factory.create_service_layer(&id, &d).unwrap().unwrap();

        let updated = factory
            .update_service_layer(&id, &d, Some(&first))
            .unwrap()
            .unwrap();
        assert_eq!(updated.revision, 1);
    }
}
