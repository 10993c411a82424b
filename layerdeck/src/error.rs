//! Error types for layer construction, surface writes and stack operations.

use thiserror::Error;

use crate::ids::{LayerId, ModuleId};

/// Errors raised by a [`LayerFactory`](crate::factory::LayerFactory).
///
/// "No renderable layer" is not an error; factories return `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The descriptor has no data-source reference.
    #[error("Layer {0} has no data source")]
    MissingSource(LayerId),

    /// The service descriptor is unusable.
    #[error("Invalid service layer {layer}: {reason}")]
    InvalidService { layer: LayerId, reason: String },

    /// Any other construction failure.
    #[error("Failed to build layer {layer}: {reason}")]
    BuildFailed { layer: LayerId, reason: String },
}

/// Errors raised by a [`MapSurface`](crate::surface::MapSurface).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// A layer with this id is already attached.
    #[error("Layer {0} is already attached to the map surface")]
    DuplicateLayer(LayerId),

    /// The requested `before` anchor is not attached.
    #[error("Anchor layer {0} is not attached to the map surface")]
    UnknownAnchor(LayerId),

    /// The label-overlay path could not render the descriptor.
    #[error("Label overlay for {layer} failed: {reason}")]
    LabelOverlay { layer: LayerId, reason: String },
}

/// Errors returned by [`LayerStack`](crate::stack::LayerStack) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// The factory failed; the registries were left untouched.
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),

    /// The operation needs a map surface and none is attached.
    #[error("No map surface is attached")]
    NoSurface,

    /// The layer id is already bound to a different module.
    #[error("Layer {layer} already belongs to module {owner}")]
    LayerInUse { layer: LayerId, owner: ModuleId },

    /// The layer id is held by the base layer or by the other registry.
    #[error("Layer id {layer} is reserved by the {owner}")]
    ReservedId { layer: LayerId, owner: &'static str },

    /// Layer ids must be non-empty.
    #[error("Layer id must not be empty")]
    EmptyLayerId,

    /// The configured base boundary layer did not produce a renderable layer.
    #[error("Base layer {0} did not produce a renderable layer")]
    BaseLayerNotRenderable(LayerId),
}
