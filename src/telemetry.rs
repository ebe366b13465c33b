//! Telemetry helpers for applications embedding `chart-gpu`.
//!
//! The render core only emits `tracing` events; installing a subscriber is
//! left to the host. `init_default_tracing` is a convenience for demos, tests
//! and benchmarks that want readable output without extra wiring.

/// Installs a compact `tracing` subscriber honouring `RUST_LOG` when the
/// `telemetry` feature is enabled.
///
/// Returns `false` when the feature is disabled or when the host application
/// already installed a global subscriber.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_target(false)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
