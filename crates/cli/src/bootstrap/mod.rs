pub mod config;
pub mod layer;
pub mod logging;

pub use config::{load_config, log_config};
pub use layer::{build_layer, SqliteLayer};
pub use logging::init_logging;
