//! Replay command.
//!
//! Feeds a recorded event script through the event dispatcher, using the
//! stock layer factory and an in-memory map surface, then prints what the
//! engine would draw and what the map has attached.

use std::path::PathBuf;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::mpsc;
use tracing::{info, warn};

use layerdeck::config::StackConfig;
use layerdeck::events::load_script;
use layerdeck::factory::{DeckLayerFactory, DeckLayerKind};
use layerdeck::logging::{default_log_dir, default_log_file, init_logging};
use layerdeck::surface::{MemorySurface, SurfaceLayer, SurfaceLayerKind};
use layerdeck::{EventDispatcher, LayerEvent, LayerStack, StackNotification};

use super::config::resolve_path;
use crate::error::CliError;

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub script: PathBuf,
    pub config: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Final state after a replay.
#[derive(Debug)]
pub struct ReplayOutcome {
    /// Render list entries, `id (kind)`, bottom to top.
    pub render_list: Vec<String>,
    pub style: String,
    pub surface: Vec<SurfaceLayer>,
    pub notifications: Vec<StackNotification>,
    pub applied: u64,
    pub failed: u64,
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let config = StackConfig::load_from(&resolve_path(args.config))?;

    let log_dir = args.log_dir.unwrap_or_else(default_log_dir);
    let _guard = init_logging(&log_dir, default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let events = load_script(&args.script)?;
    info!(script = %args.script.display(), events = events.len(), "Replaying event script");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(CliError::Runtime)?;
    let outcome = runtime.block_on(replay(config, events))?;

    print!("{}", render(&outcome));
    Ok(())
}

/// Build a stack on a fresh surface and push `events` through it.
pub async fn replay(
    config: StackConfig,
    events: Vec<LayerEvent>,
) -> Result<ReplayOutcome, CliError> {
    let style = config.map.style.clone();
    let mut stack = LayerStack::new(config, DeckLayerFactory::new())?;
    stack.attach_surface(MemorySurface::new(style));

    let mut dispatcher = EventDispatcher::new(stack);
    let mut notifications = dispatcher.subscribe();

    let (tx, rx) = mpsc::unbounded_channel();
    for event in events {
        if tx.send(event).is_err() {
            break;
        }
    }
    drop(tx);

    dispatcher.run(rx).await;

    let mut received = Vec::new();
    loop {
        match notifications.try_recv() {
            Ok(notification) => received.push(notification),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Dropped notifications during replay");
            }
            Err(_) => break,
        }
    }

    let stack = dispatcher.stack();
    let render_list = stack
        .render_list()
        .iter()
        .map(|layer| format!("{} ({})", layer.id, kind_label(&layer.kind)))
        .collect();
    let (style, surface) = match stack.surface() {
        Some(surface) => (surface.style().to_string(), surface.layers().to_vec()),
        None => (String::new(), Vec::new()),
    };

    Ok(ReplayOutcome {
        render_list,
        style,
        surface,
        notifications: received,
        applied: dispatcher.applied(),
        failed: dispatcher.failed(),
    })
}

fn kind_label(kind: &DeckLayerKind) -> String {
    match kind {
        DeckLayerKind::Geometry(geometry) => geometry.to_string(),
        DeckLayerKind::Service(service) => format!("{} service", service),
    }
}

/// Plain-text report of a replay.
pub fn render(outcome: &ReplayOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Events: {} applied, {} failed\n\n",
        outcome.applied, outcome.failed
    ));

    out.push_str("Render list (bottom to top)\n");
    out.push_str("===========================\n");
    for (index, entry) in outcome.render_list.iter().enumerate() {
        out.push_str(&format!("  {:>2}. {}\n", index, entry));
    }
    out.push('\n');

    out.push_str(&format!("Map surface: {}\n", outcome.style));
    out.push_str("===========================\n");
    if outcome.surface.is_empty() {
        out.push_str("  (empty)\n");
    }
    for (index, layer) in outcome.surface.iter().enumerate() {
        let kind = match &layer.kind {
            SurfaceLayerKind::Engine => "engine".to_string(),
            SurfaceLayerKind::Label { source } => format!("label: {}", source),
        };
        out.push_str(&format!("  {:>2}. {} [{}]\n", index, layer.id, kind));
    }
    out.push('\n');

    out.push_str("Notifications\n");
    out.push_str("===========================\n");
    if outcome.notifications.is_empty() {
        out.push_str("  (none)\n");
    }
    for notification in &outcome.notifications {
        let line = match notification {
            StackNotification::LayersRemoved { source, modules } => {
                let modules: Vec<_> = modules.iter().map(|m| m.to_string()).collect();
                format!("layers removed for {}: {}", source, modules.join(", "))
            }
            StackNotification::StyleReconciled { restored } => {
                format!("style reconciled, {} layers restored", restored.len())
            }
            StackNotification::Cleared => "stack cleared".to_string(),
        };
        out.push_str(&format!("  - {}\n", line));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerdeck::events::parse_script;

    const SCRIPT: &str = r#"
{"event":"add_service_layer","layer_id":"S1","descriptor":{"kind":"xyz","url":"https://tiles.example.com/{z}/{x}/{y}.png"}}
{"event":"add_layer","module_id":"m1","layer_id":"L1","descriptor":{"kind":"point","source":"cities.csv"}}
{"event":"add_layer","module_id":"m2","layer_id":"T1","descriptor":{"kind":"text","source":"names.csv"}}
{"event":"switch_style","style":"light"}
{"event":"style_loaded"}
{"event":"add_layer","module_id":"m3","layer_id":"X","descriptor":{"kind":"line","source":""}}
"#;

    #[tokio::test]
    async fn test_replay_collects_final_state() {
        let events = parse_script(SCRIPT).unwrap();
        let outcome = replay(StackConfig::default(), events).await.unwrap();

        assert_eq!(outcome.applied, 5);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            outcome.render_list,
            vec![
                "national_boundary_line (line)".to_string(),
                "L1 (point)".to_string(),
                "S1 (xyz service)".to_string(),
            ]
        );
        assert_eq!(outcome.style, "light");

        let surface: Vec<_> = outcome.surface.iter().map(|l| l.id.to_string()).collect();
        assert_eq!(surface, ["national_boundary_line", "S1", "L1", "T1"]);
        assert_eq!(outcome.notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_render_report() {
        let events = parse_script(SCRIPT).unwrap();
        let outcome = replay(StackConfig::default(), events).await.unwrap();
        let text = render(&outcome);

        assert!(text.contains("Events: 5 applied, 1 failed"));
        assert!(text.contains("T1 [label: names.csv]"));
        assert!(text.contains("style reconciled, 4 layers restored"));
    }

    #[tokio::test]
    async fn test_text_base_layer_is_rejected() {
        let mut config = StackConfig::default();
        config.base_layer.kind = layerdeck::GeometryKind::Text;

        let result = replay(config, Vec::new()).await;
        assert!(matches!(result, Err(CliError::Stack(_))));
    }
}
