//! Tracing setup for the browser worker and for native runs.
//!
//! On `wasm32` events go to the browser console through `tracing-wasm`;
//! natively a `tracing-subscriber` fmt layer filtered by `RUST_LOG` is used.

use std::sync::Once;

static INIT: Once = Once::new();

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "party_engine=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging() {
    INIT.call_once(install);
}

#[cfg(target_arch = "wasm32")]
fn install() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

#[cfg(not(target_arch = "wasm32"))]
fn install() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());
    // A test harness may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
