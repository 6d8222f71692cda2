pub mod assets;
pub mod config;
pub mod desktop;
pub mod error;
pub mod vision;

pub use assets::AssetRegistry;
pub use config::EngineConfig;
pub use desktop::DesktopManager;
pub use error::{Error, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber, filtered by `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
