//! Layer descriptors.
//!
//! A descriptor is the full configuration used to build or update a layer.
//! Each mutation hands the registry a fresh, immutable snapshot; the registry
//! keeps the most recently applied one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Geometry kind of a data layer.
///
/// `Text` layers are not drawn by the rendering engine; they take the
/// label-overlay path on the map surface instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    Heatmap,
    Hexagon,
    Arc,
    Text,
}

impl GeometryKind {
    /// All kinds, in declaration order.
    pub const ALL: [GeometryKind; 7] = [
        GeometryKind::Point,
        GeometryKind::Line,
        GeometryKind::Polygon,
        GeometryKind::Heatmap,
        GeometryKind::Hexagon,
        GeometryKind::Arc,
        GeometryKind::Text,
    ];

    /// Lowercase name used in config files and event scripts.
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::Line => "line",
            GeometryKind::Polygon => "polygon",
            GeometryKind::Heatmap => "heatmap",
            GeometryKind::Hexagon => "hexagon",
            GeometryKind::Arc => "arc",
            GeometryKind::Text => "text",
        }
    }

    /// Whether layers of this kind render through the label-overlay path.
    pub fn is_label(&self) -> bool {
        matches!(self, GeometryKind::Text)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        GeometryKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown geometry kind '{}'", s))
    }
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

/// Configuration snapshot for a data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Geometry kind, which decides the rendering path.
    pub kind: GeometryKind,

    /// Data-source reference (uploaded file, dataset URL, ...).
    pub source: String,

    /// Whether the layer is visible.
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Layer opacity in `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Free-form style properties passed through to the factory.
    #[serde(default)]
    pub style: serde_json::Map<String, serde_json::Value>,
}

impl LayerDescriptor {
    /// Create a visible, fully opaque descriptor with no style properties.
    pub fn new(kind: GeometryKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            visible: true,
            opacity: 1.0,
            style: serde_json::Map::new(),
        }
    }

    /// Set visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Protocol of a remote map service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Wms,
    Wmts,
    Xyz,
    #[serde(rename = "arcgis")]
    ArcGis,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceKind::Wms => "wms",
            ServiceKind::Wmts => "wmts",
            ServiceKind::Xyz => "xyz",
            ServiceKind::ArcGis => "arcgis",
        };
        f.write_str(name)
    }
}

/// Configuration snapshot for a remote-service-backed layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service protocol.
    pub kind: ServiceKind,

    /// Endpoint URL.
    pub url: String,

    /// Service-side layer names to request.
    #[serde(default)]
    pub layers: Vec<String>,

    /// Whether the layer is visible.
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Layer opacity in `0.0..=1.0`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl ServiceDescriptor {
    /// Create a visible, fully opaque service descriptor.
    pub fn new(kind: ServiceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            layers: Vec::new(),
            visible: true,
            opacity: 1.0,
        }
    }

    /// Add a service-side layer name.
    pub fn with_layer(mut self, name: impl Into<String>) -> Self {
        self.layers.push(name.into());
        self
    }
}
