//! Render list aggregation.
//!
//! The rendering engine receives one ordered list per draw cycle:
//!
//! ```text
//! [base boundary layer] ++ data layers (insertion order) ++ service layers (insertion order)
//! ```
//!
//! Label-overlay entries and service layers with nothing to draw are skipped;
//! the surface draws labels itself. Assembly only borrows the stored objects,
//! so it is cheap enough to run every frame.

use crate::registry::LayerRegistry;
use crate::service::ServiceLayerRegistry;

/// Assemble the engine's draw list.
pub fn render_list<'a, L>(
    base: &'a L,
    layers: &'a LayerRegistry<L>,
    services: &'a ServiceLayerRegistry<L>,
) -> Vec<&'a L> {
    let mut list = Vec::with_capacity(1 + layers.len() + services.len());
    list.push(base);
    list.extend(layers.rendered());
    list.extend(services.rendered());
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{GeometryKind, LayerDescriptor, ServiceDescriptor, ServiceKind};
    use crate::factory::{DeckLayer, DeckLayerFactory, LayerFactory};
    use crate::ids::{LayerId, ModuleId};

    fn ids(list: &[&DeckLayer]) -> Vec<String> {
        list.iter().map(|l| l.id.to_string()).collect()
    }

    #[test]
    fn test_order_is_base_data_services() {
        let mut factory = DeckLayerFactory::new();
        let base = factory
            .create_layer(
                &LayerId::from("base"),
                &LayerDescriptor::new(GeometryKind::Line, "boundary.geojson"),
            )
            .unwrap()
            .unwrap();

        let mut layers = LayerRegistry::new();
        let mut services = ServiceLayerRegistry::new();

        services
            .upsert(
                &mut factory,
                LayerId::from("S1"),
                ServiceDescriptor::new(ServiceKind::Xyz, "https://tiles.example.com"),
            )
            .unwrap();
        layers
            .upsert(
                &mut factory,
                ModuleId::from("m1"),
                LayerId::from("L1"),
                LayerDescriptor::new(GeometryKind::Point, "a.csv"),
            )
            .unwrap();
        layers
            .upsert(
                &mut factory,
                ModuleId::from("m2"),
                LayerId::from("T1"),
                LayerDescriptor::new(GeometryKind::Text, "a.csv"),
            )
            .unwrap();
        layers
            .upsert(
                &mut factory,
                ModuleId::from("m3"),
                LayerId::from("L2"),
                LayerDescriptor::new(GeometryKind::Arc, "b.csv"),
            )
            .unwrap();

        let list = render_list(&base, &layers, &services);
        assert_eq!(ids(&list), vec!["base", "L1", "L2", "S1"]);
    }

    #[test]
    fn test_empty_registries_yield_base_only() {
        let mut factory = DeckLayerFactory::new();
        let base = factory
            .create_layer(
                &LayerId::from("base"),
                &LayerDescriptor::new(GeometryKind::Line, "boundary.geojson"),
            )
            .unwrap()
            .unwrap();
        let layers = LayerRegistry::new();
        let services = ServiceLayerRegistry::new();

        assert_eq!(ids(&render_list(&base, &layers, &services)), vec!["base"]);
    }
}
