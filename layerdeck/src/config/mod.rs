//! Configuration for the layer stack.
//!
//! Settings are stored in `~/.layerdeck/config.ini`:
//!
//! ```ini
//! [base_layer]
//! id = national_boundary_line
//! source = boundaries/national_boundary.geojson
//! kind = line
//!
//! [services]
//! ; service layers are attached beneath this layer when it is on the map
//! preload_anchor =
//!
//! [map]
//! style = mapbox://styles/mapbox/dark-v10
//! ```
//!
//! Missing files and missing keys fall back to defaults.

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, ConfigError};
pub use settings::{
    BaseLayerSettings, MapSettings, ServiceSettings, StackConfig, DEFAULT_BASE_LAYER_ID,
    DEFAULT_BASE_LAYER_SOURCE, DEFAULT_MAP_STYLE,
};
