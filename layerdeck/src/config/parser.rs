//! INI mapping for [`StackConfig`].
//!
//! The single place where INI keys are mapped to struct fields, in both
//! directions.

use ini::Ini;

use super::file::ConfigError;
use super::settings::StackConfig;
use crate::descriptor::GeometryKind;
use crate::ids::LayerId;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Overlay INI values on top of the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<StackConfig, ConfigError> {
    let mut config = StackConfig::default();

    // [base_layer] section
    if let Some(section) = ini.section(Some("base_layer")) {
        if let Some(v) = section.get("id") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("base_layer", "id", v, "must not be empty"));
            }
            config.base_layer.id = LayerId::from(v);
        }
        if let Some(v) = section.get("source") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("base_layer", "source", v, "must not be empty"));
            }
            config.base_layer.source = v.to_string();
        }
        if let Some(v) = section.get("kind") {
            let kind: GeometryKind = v.parse().map_err(|_| {
                invalid(
                    "base_layer",
                    "kind",
                    v,
                    "must be one of: point, line, polygon, heatmap, hexagon, arc",
                )
            })?;
            if kind.is_label() {
                return Err(invalid(
                    "base_layer",
                    "kind",
                    v,
                    "the base layer must be drawn by the rendering engine",
                ));
            }
            config.base_layer.kind = kind;
        }
    }

    // [services] section
    if let Some(section) = ini.section(Some("services")) {
        if let Some(v) = section.get("preload_anchor") {
            let v = v.trim();
            config.services.preload_anchor = if v.is_empty() {
                None
            } else {
                Some(LayerId::from(v))
            };
        }
    }

    // [map] section
    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = section.get("style") {
            let v = v.trim();
            if !v.is_empty() {
                config.map.style = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Build the INI representation of a config.
pub(super) fn to_ini(config: &StackConfig) -> Ini {
    let mut ini = Ini::new();
    ini.with_section(Some("base_layer"))
        .set("id", config.base_layer.id.as_str())
        .set("source", config.base_layer.source.as_str())
        .set("kind", config.base_layer.kind.name());
    ini.with_section(Some("services")).set(
        "preload_anchor",
        config
            .services
            .preload_anchor
            .as_ref()
            .map(LayerId::as_str)
            .unwrap_or(""),
    );
    ini.with_section(Some("map"))
        .set("style", config.map.style.as_str());
    ini
}
