//! Lifecycle event adapter.
//!
//! Hosts talk to a [`LayerStack`] through messages instead of calling it
//! directly. Events arrive on an unbounded mpsc channel and are applied
//! strictly in delivery order by an [`EventDispatcher`]; outcomes that other
//! parts of the host care about are published on a broadcast channel.
//!
//! ```text
//!  host ──LayerEvent──► mpsc ──► EventDispatcher ──► LayerStack ──► MapSurface
//!                                      │
//!                                      └──StackNotification──► broadcast ──► subscribers
//! ```
//!
//! Events also have a JSON Lines form, one internally tagged object per
//! line, which the CLI uses to replay recorded sessions:
//!
//! ```text
//! {"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{"kind":"point","source":"a.csv"}}
//! {"event":"switch_style","style":"dark"}
//! {"event":"style_loaded"}
//! ```
//!
//! # Example
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut dispatcher = EventDispatcher::new(stack);
//! let mut notifications = dispatcher.subscribe();
//!
//! for event in parse_script(&script)? {
//!     tx.send(event)?;
//! }
//! drop(tx);
//! dispatcher.run(rx).await;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::descriptor::{LayerDescriptor, ServiceDescriptor};
use crate::error::StackError;
use crate::factory::LayerFactory;
use crate::ids::{LayerId, ModuleId};
use crate::stack::LayerStack;
use crate::surface::MapSurface;

/// Capacity of the notification broadcast channel.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// One lifecycle message from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LayerEvent {
    /// Create or update the layer owned by a module.
    AddLayer {
        module_id: ModuleId,
        layer_id: LayerId,
        descriptor: LayerDescriptor,
    },
    /// Delete the layer owned by a module.
    DeleteLayer { module_id: ModuleId },
    /// Delete every layer rendering the given data source.
    DeleteSource { source: String },
    /// Create or update a map service layer.
    AddServiceLayer {
        layer_id: LayerId,
        descriptor: ServiceDescriptor,
    },
    /// Delete a map service layer.
    DeleteServiceLayer { layer_id: LayerId },
    /// Swap the map style.
    SwitchStyle { style: String },
    /// The map finished loading the new style.
    StyleLoaded,
    /// Reset every layer.
    Clear,
}

impl LayerEvent {
    /// Short event name, as it appears in the `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            LayerEvent::AddLayer { .. } => "add_layer",
            LayerEvent::DeleteLayer { .. } => "delete_layer",
            LayerEvent::DeleteSource { .. } => "delete_source",
            LayerEvent::AddServiceLayer { .. } => "add_service_layer",
            LayerEvent::DeleteServiceLayer { .. } => "delete_service_layer",
            LayerEvent::SwitchStyle { .. } => "switch_style",
            LayerEvent::StyleLoaded => "style_loaded",
            LayerEvent::Clear => "clear",
        }
    }
}

/// Outcome published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StackNotification {
    /// Layers were removed because their data source was deleted.
    LayersRemoved {
        source: String,
        modules: Vec<ModuleId>,
    },
    /// The surface was rebuilt after a style switch.
    StyleReconciled { restored: Vec<LayerId> },
    /// Every layer was reset.
    Cleared,
}

/// Errors reading an event script.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read event script: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse a JSON Lines event script.
///
/// Blank lines and lines starting with `#` are skipped. Line numbers in
/// errors are 1-based.
pub fn parse_script(script: &str) -> Result<Vec<LayerEvent>, EventError> {
    script
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            serde_json::from_str(text).map_err(|source| EventError::Parse { line, source })
        })
        .collect()
}

/// Read and parse an event script from disk.
pub fn load_script(path: &Path) -> Result<Vec<LayerEvent>, EventError> {
    let script = std::fs::read_to_string(path)?;
    parse_script(&script)
}

/// Applies lifecycle events to a [`LayerStack`] in order.
pub struct EventDispatcher<F: LayerFactory, S> {
    stack: LayerStack<F, S>,
    notify: broadcast::Sender<StackNotification>,
    applied: u64,
    failed: u64,
}

impl<F, S> EventDispatcher<F, S>
where
    F: LayerFactory,
    S: MapSurface,
{
    pub fn new(stack: LayerStack<F, S>) -> Self {
        let (notify, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            stack,
            notify,
            applied: 0,
            failed: 0,
        }
    }

    /// Subscribe to notifications published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StackNotification> {
        self.notify.subscribe()
    }

    /// Apply a single event.
    pub fn dispatch(&mut self, event: LayerEvent) -> Result<(), StackError> {
        debug!(event = event.name(), "Dispatching layer event");

        let result = self.apply(event);
        match result {
            Ok(()) => self.applied += 1,
            Err(_) => self.failed += 1,
        }
        result
    }

    /// Drain `rx` until every sender is dropped.
    ///
    /// A failing event is logged and skipped.
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<LayerEvent>) {
        info!("Layer event loop starting");

        while let Some(event) = rx.recv().await {
            let name = event.name();
            if let Err(error) = self.dispatch(event) {
                warn!(event = name, error = %error, "Layer event failed");
            }
        }

        info!(
            applied = self.applied,
            failed = self.failed,
            "Layer event loop stopped"
        );
    }

    /// Number of events applied successfully.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Number of events that returned an error.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn stack(&self) -> &LayerStack<F, S> {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut LayerStack<F, S> {
        &mut self.stack
    }

    pub fn into_stack(self) -> LayerStack<F, S> {
        self.stack
    }

    fn apply(&mut self, event: LayerEvent) -> Result<(), StackError> {
        match event {
            LayerEvent::AddLayer {
                module_id,
                layer_id,
                descriptor,
            } => {
                self.stack.add_or_update(module_id, layer_id, descriptor)?;
            }
            LayerEvent::DeleteLayer { module_id } => {
                self.stack.delete_module(&module_id);
            }
            LayerEvent::DeleteSource { source } => {
                let modules = self.stack.delete_source(&source);
                self.publish(StackNotification::LayersRemoved { source, modules });
            }
            LayerEvent::AddServiceLayer {
                layer_id,
                descriptor,
            } => {
                self.stack.add_or_update_service(layer_id, descriptor)?;
            }
            LayerEvent::DeleteServiceLayer { layer_id } => {
                self.stack.delete_service(&layer_id);
            }
            LayerEvent::SwitchStyle { style } => self.stack.switch_style(&style)?,
            LayerEvent::StyleLoaded => {
                if let Some(report) = self.stack.on_style_switched() {
                    self.publish(StackNotification::StyleReconciled {
                        restored: report.restored,
                    });
                }
            }
            LayerEvent::Clear => {
                self.stack.clear();
                self.publish(StackNotification::Cleared);
            }
        }
        Ok(())
    }

    fn publish(&self, notification: StackNotification) {
        // No subscribers is fine.
        let _ = self.notify.send(notification);
    }
}

impl<F, S> std::fmt::Debug for EventDispatcher<F, S>
where
    F: LayerFactory,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("stack", &self.stack)
            .field("applied", &self.applied)
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::descriptor::GeometryKind;
    use crate::factory::DeckLayerFactory;
    use crate::surface::MemorySurface;

    type Dispatcher = EventDispatcher<DeckLayerFactory, MemorySurface>;

    fn dispatcher() -> Dispatcher {
        let mut stack = LayerStack::new(StackConfig::default(), DeckLayerFactory::new()).unwrap();
        stack.attach_surface(MemorySurface::new("light"));
        EventDispatcher::new(stack)
    }

    fn add(module: &str, layer: &str, source: &str) -> LayerEvent {
        LayerEvent::AddLayer {
            module_id: ModuleId::from(module),
            layer_id: LayerId::from(layer),
            descriptor: LayerDescriptor::new(GeometryKind::Point, source),
        }
    }

    #[test]
    fn test_parse_script_skips_comments_and_blanks() {
        let script = r#"
# boot sequence
{"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{"kind":"point","source":"a.csv"}}

{"event":"style_loaded"}
{"event":"clear"}
"#;
        let events = parse_script(script).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], add("m1", "L1", "a.csv"));
        assert_eq!(events[1], LayerEvent::StyleLoaded);
        assert_eq!(events[2], LayerEvent::Clear);
    }

    #[test]
    fn test_parse_script_service_event() {
        let script = r#"{"event":"add_service_layer","layer_id":"S1","descriptor":{"kind":"wms","url":"https://maps.example.com/wms","layers":["roads"]}}"#;
        let events = parse_script(script).unwrap();
        match &events[0] {
            LayerEvent::AddServiceLayer { layer_id, descriptor } => {
                assert_eq!(layer_id, &LayerId::from("S1"));
                assert_eq!(descriptor.layers, vec!["roads".to_string()]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_script_reports_line_number() {
        let script = "{\"event\":\"clear\"}\n\n{\"event\":\"explode\"}\n";
        match parse_script(script) {
            Err(EventError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_event_name_matches_tag() {
        let event = LayerEvent::DeleteSource {
            source: "a.csv".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }

    #[test]
    fn test_load_script_missing_file() {
        let result = load_script(Path::new("/nonexistent/layerdeck/script.jsonl"));
        assert!(matches!(result, Err(EventError::Io(_))));
    }

    #[test]
    fn test_dispatch_add_and_delete() {
        let mut dispatcher = dispatcher();
        dispatcher.dispatch(add("m1", "L1", "a.csv")).unwrap();
        assert_eq!(dispatcher.stack().layer_count(), 1);

        dispatcher
            .dispatch(LayerEvent::DeleteLayer {
                module_id: ModuleId::from("m1"),
            })
            .unwrap();
        dispatcher
            .dispatch(LayerEvent::DeleteLayer {
                module_id: ModuleId::from("m1"),
            })
            .unwrap();
        assert_eq!(dispatcher.stack().layer_count(), 0);
        assert_eq!(dispatcher.applied(), 3);
    }

    #[test]
    fn test_dispatch_counts_failures() {
        let mut dispatcher = dispatcher();
        let result = dispatcher.dispatch(add("m1", "L1", ""));
        assert!(matches!(result, Err(StackError::Factory(_))));
        assert_eq!(dispatcher.failed(), 1);
        assert_eq!(dispatcher.applied(), 0);
    }

    #[test]
    fn test_delete_source_notifies_subscribers() {
        let mut dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(add("m1", "L1", "a.csv")).unwrap();
        dispatcher.dispatch(add("m2", "L2", "a.csv")).unwrap();

        dispatcher
            .dispatch(LayerEvent::DeleteSource {
                source: "a.csv".to_string(),
            })
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            StackNotification::LayersRemoved {
                source: "a.csv".to_string(),
                modules: vec![ModuleId::from("m1"), ModuleId::from("m2")],
            }
        );
    }

    #[test]
    fn test_style_loaded_without_switch_is_silent() {
        let mut dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(LayerEvent::StyleLoaded).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_style_switch_publishes_reconciliation() {
        let mut dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(add("m1", "L1", "a.csv")).unwrap();
        dispatcher
            .dispatch(LayerEvent::SwitchStyle {
                style: "dark".to_string(),
            })
            .unwrap();
        dispatcher.dispatch(LayerEvent::StyleLoaded).unwrap();

        match rx.try_recv().unwrap() {
            StackNotification::StyleReconciled { restored } => {
                assert_eq!(restored.len(), 2);
                assert_eq!(restored[1], LayerId::from("L1"));
            }
            other => panic!("unexpected notification {:?}", other),
        }
    }

    #[test]
    fn test_clear_publishes_cleared() {
        let mut dispatcher = dispatcher();
        let mut rx = dispatcher.subscribe();
        dispatcher.dispatch(LayerEvent::Clear).unwrap();
        assert_eq!(rx.try_recv().unwrap(), StackNotification::Cleared);
    }

    #[tokio::test]
    async fn test_run_drains_channel_in_order() {
        let mut dispatcher = dispatcher();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(add("m1", "L1", "a.csv")).unwrap();
        tx.send(add("m1", "L2", "a.csv")).unwrap();
        tx.send(add("m2", "L3", "")).unwrap();
        tx.send(add("m3", "L4", "b.csv")).unwrap();
        drop(tx);

        dispatcher.run(rx).await;

        let stack = dispatcher.stack();
        assert_eq!(stack.layer_for_module(&ModuleId::from("m1")), Some(&LayerId::from("L2")));
        assert!(stack.layer_for_module(&ModuleId::from("m2")).is_none());
        assert_eq!(dispatcher.applied(), 3);
        assert_eq!(dispatcher.failed(), 1);
    }
}
