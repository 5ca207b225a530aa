pub mod build_info;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global tracing subscriber. `RUST_LOG` wins over the default
/// `club_core=info` directive.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("club_core=info"));

        // A host application may already own the global subscriber.
        let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    });
}
