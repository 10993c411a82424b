//! Configuration structs and defaults.

use crate::descriptor::{GeometryKind, LayerDescriptor};
use crate::ids::LayerId;

/// Id of the mandatory base boundary layer.
pub const DEFAULT_BASE_LAYER_ID: &str = "national_boundary_line";

/// Data source of the base boundary layer.
pub const DEFAULT_BASE_LAYER_SOURCE: &str = "boundaries/national_boundary.geojson";

/// Base map style loaded at startup.
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/dark-v10";

/// Top-level stack configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackConfig {
    pub base_layer: BaseLayerSettings,
    pub services: ServiceSettings,
    pub map: MapSettings,
}

/// `[base_layer]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseLayerSettings {
    /// Layer id; also the lowest entry of every reconciliation.
    pub id: LayerId,
    pub source: String,
    pub kind: GeometryKind,
}

impl Default for BaseLayerSettings {
    fn default() -> Self {
        Self {
            id: LayerId::from(DEFAULT_BASE_LAYER_ID),
            source: DEFAULT_BASE_LAYER_SOURCE.to_string(),
            kind: GeometryKind::Line,
        }
    }
}

impl BaseLayerSettings {
    /// Descriptor the base layer is built from.
    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor::new(self.kind, self.source.clone())
    }
}

/// `[services]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceSettings {
    /// Reserved top layer; new service layers are attached beneath it.
    pub preload_anchor: Option<LayerId>,
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub style: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            style: DEFAULT_MAP_STYLE.to_string(),
        }
    }
}

impl StackConfig {
    /// Set the preload anchor.
    pub fn with_preload_anchor(mut self, anchor: impl Into<LayerId>) -> Self {
        self.services.preload_anchor = Some(anchor.into());
        self
    }

    /// Set the base layer id.
    pub fn with_base_layer_id(mut self, id: impl Into<LayerId>) -> Self {
        self.base_layer.id = id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StackConfig::default();
        assert_eq!(config.base_layer.id, LayerId::from(DEFAULT_BASE_LAYER_ID));
        assert_eq!(config.base_layer.kind, GeometryKind::Line);
        assert!(config.services.preload_anchor.is_none());
        assert_eq!(config.map.style, DEFAULT_MAP_STYLE);
    }

    #[test]
    fn test_base_descriptor() {
        let d = BaseLayerSettings::default().descriptor();
        assert_eq!(d.kind, GeometryKind::Line);
        assert_eq!(d.source, DEFAULT_BASE_LAYER_SOURCE);
    }

    #[test]
    fn test_builders() {
        let config = StackConfig::default()
            .with_preload_anchor("labels-top")
            .with_base_layer_id("coastline");
        assert_eq!(
            config.services.preload_anchor,
            Some(LayerId::from("labels-top"))
        );
        assert_eq!(config.base_layer.id, LayerId::from("coastline"));
    }
}
