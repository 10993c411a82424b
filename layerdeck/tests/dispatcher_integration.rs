//! Integration tests for the event dispatcher.
//!
//! These tests feed lifecycle events through the mpsc channel the way a host
//! would and check the resulting stack and the broadcast notifications.
//!
//! Run with: `cargo test --test dispatcher_integration`

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use layerdeck::config::{StackConfig, DEFAULT_BASE_LAYER_ID};
use layerdeck::events::parse_script;
use layerdeck::factory::DeckLayerFactory;
use layerdeck::surface::MemorySurface;
use layerdeck::{EventDispatcher, LayerId, LayerStack, ModuleId, StackNotification};

type Dispatcher = EventDispatcher<DeckLayerFactory, MemorySurface>;

const SESSION: &str = r#"
# upload two files, add a basemap service, switch styles
{"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{"kind":"point","source":"cities.csv"}}
{"event":"add_layer","module_id":"m2","layer_id":"L2","descriptor":{"kind":"text","source":"names.csv"}}
{"event":"add_service_layer","layer_id":"S1","descriptor":{"kind":"xyz","url":"https://tiles.example.com/{z}/{x}/{y}.png"}}
{"event":"switch_style","style":"mapbox://styles/mapbox/light-v10"}
{"event":"style_loaded"}
{"event":"delete_source","source":"cities.csv"}
"#;

fn dispatcher() -> Dispatcher {
    let mut stack = LayerStack::new(StackConfig::default(), DeckLayerFactory::new()).unwrap();
    stack.attach_surface(MemorySurface::new("mapbox://styles/mapbox/dark-v10"));
    EventDispatcher::new(stack)
}

fn drain(rx: &mut broadcast::Receiver<StackNotification>) -> Vec<StackNotification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

/// A recorded session replays in order and publishes its outcomes.
#[tokio::test]
async fn test_session_replay_over_channel() {
    let mut dispatcher = dispatcher();
    let mut notifications = dispatcher.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();

    for event in parse_script(SESSION).unwrap() {
        tx.send(event).unwrap();
    }
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), dispatcher.run(rx))
        .await
        .expect("event loop should stop once the channel closes");

    let received = drain(&mut notifications);
    assert_eq!(
        received,
        vec![
            StackNotification::StyleReconciled {
                restored: vec![
                    LayerId::from(DEFAULT_BASE_LAYER_ID),
                    LayerId::from("S1"),
                    LayerId::from("L1"),
                    LayerId::from("L2"),
                ],
            },
            StackNotification::LayersRemoved {
                source: "cities.csv".to_string(),
                modules: vec![ModuleId::from("m1")],
            },
        ]
    );

    let stack = dispatcher.stack();
    let surface = stack.surface().unwrap();
    assert_eq!(surface.style(), "mapbox://styles/mapbox/light-v10");
    assert_eq!(
        surface.layer_ids(),
        vec![
            LayerId::from(DEFAULT_BASE_LAYER_ID),
            LayerId::from("S1"),
            LayerId::from("L2"),
        ]
    );
    assert_eq!(surface.label_ids(), vec![LayerId::from("L2")]);
    assert_eq!(dispatcher.failed(), 0);
}

/// Events sent from another task are applied once the sender finishes.
#[tokio::test]
async fn test_events_from_spawned_producer() {
    let mut dispatcher = dispatcher();
    let (tx, rx) = mpsc::unbounded_channel();

    let producer = tokio::spawn(async move {
        for event in parse_script(SESSION).unwrap() {
            if tx.send(event).is_err() {
                break;
            }
            tokio::task::yield_now().await;
        }
    });

    dispatcher.run(rx).await;
    producer.await.unwrap();

    assert_eq!(dispatcher.applied(), 6);
    assert_eq!(dispatcher.stack().module_count(), 1);
}

/// A bad event is skipped and the loop keeps going.
#[tokio::test]
async fn test_failed_event_does_not_stop_loop() {
    let script = r#"
{"event":"add_service_layer","layer_id":"S1","descriptor":{"kind":"wms","url":"https://maps.example.com/wms"}}
{"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{"kind":"line","source":"roads.csv"}}
{"event":"clear"}
{"event":"add_layer","module_id":"m2","layer_id":"L2","descriptor":{"kind":"arc","source":"flights.csv"}}
"#;
    let mut dispatcher = dispatcher();
    let mut notifications = dispatcher.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();
    for event in parse_script(script).unwrap() {
        tx.send(event).unwrap();
    }
    drop(tx);

    dispatcher.run(rx).await;

    assert_eq!(dispatcher.failed(), 1, "WMS without layer names is rejected");
    assert_eq!(dispatcher.applied(), 3);
    assert_eq!(drain(&mut notifications), vec![StackNotification::Cleared]);

    let stack = dispatcher.into_stack();
    assert_eq!(stack.service_count(), 0);
    assert_eq!(
        stack.layer_for_module(&ModuleId::from("m2")),
        Some(&LayerId::from("L2"))
    );
}
