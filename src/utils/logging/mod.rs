//! Logging utilities
//!
//! Installs the `tracing` subscriber used by the binary. The library itself
//! only emits events; it never installs a subscriber on its own.

mod types;

pub use types::{LogFormat, LogLevel};

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level` when it is set. Calling this more
/// than once is harmless: later calls leave the first subscriber in place.
pub fn init_tracing(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {}", e);
    }
}
