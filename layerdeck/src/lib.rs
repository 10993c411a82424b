//! LayerDeck - layer registry and style reconciliation for map layer stacks
//!
//! This library keeps a set of rendered map layers consistent with a changing
//! set of logical data sources. Drawing is delegated to an external rendering
//! engine and the base map surface may be torn down at any time (style
//! switch); what lives here is the bookkeeping:
//!
//! - mapping data-module identities to rendered-layer identities
//! - deciding whether an update creates, replaces or mutates a layer
//! - keeping the auxiliary indexes mutually consistent
//! - rebuilding the attached layer stack in z-order after a style switch
//!
//! # Architecture
//!
//! ```text
//!   LayerEvent ──► EventDispatcher ──► LayerStack
//!                                        │
//!              ┌─────────────────────────┼─────────────────────────┐
//!              ▼                         ▼                         ▼
//!        LayerRegistry          ServiceLayerRegistry          StyleReconciler
//!     (module → layer → state)     (layer → handle)     (base, services, data)
//!              │                         │                         │
//!              └──────────► render_list ◄┘                         ▼
//!                      (engine draw list)                     MapSurface
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod factory;
pub mod ids;
pub mod logging;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod service;
pub mod stack;
pub mod surface;

pub use descriptor::{GeometryKind, LayerDescriptor, ServiceDescriptor, ServiceKind};
pub use error::{FactoryError, StackError, SurfaceError};
pub use events::{EventDispatcher, LayerEvent, StackNotification};
pub use ids::{LayerId, ModuleId};
pub use stack::LayerStack;
