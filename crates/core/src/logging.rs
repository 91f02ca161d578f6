//! Logging
//!
//! Structured logging through `tracing`, formatted as text or JSON. All log
//! output goes to stderr so stdout stays reserved for the generated script.

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable selecting the log format ("json" or "text")
pub const LOG_FORMAT_ENV: &str = "DCONTAINER_LOG_FORMAT";

/// Environment variable holding the log filter directives
pub const LOG_FILTER_ENV: &str = "DCONTAINER_LOG";

/// Initialize the logging system
///
/// Safe to call more than once; only the first call installs a subscriber.
///
/// ## Arguments
///
/// * `format` - `"json"` for JSON lines, anything else (or `None`) for text.
///   When `None`, `DCONTAINER_LOG_FORMAT` is consulted.
/// * `default_filter` - filter used when neither `DCONTAINER_LOG` nor
///   `RUST_LOG` is set, e.g. `"dcontainer=debug"`.
///
/// ## Example
///
/// ```rust
/// use dcontainer_core::logging;
///
/// logging::init(None, "info").expect("Failed to initialize logging");
/// ```
pub fn init(format: Option<&str>, default_filter: &str) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter(default_filter);

        let env_format = std::env::var(LOG_FORMAT_ENV).ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(true).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter from DCONTAINER_LOG, then RUST_LOG, then the default
fn create_env_filter(default_filter: &str) -> EnvFilter {
    if let Ok(spec) = std::env::var(LOG_FILTER_ENV) {
        EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            eprintln!(
                "Invalid {} specification '{}', using '{}'",
                LOG_FILTER_ENV, spec, default_filter
            );
            fallback_filter(default_filter)
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(default_filter))
    }
}

fn fallback_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_new(default_filter).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_init_multiple_calls_safe() {
        let _guard = TEST_MUTEX.lock().unwrap();

        assert!(init(None, "info").is_ok());
        assert!(init(Some("json"), "debug").is_ok());
        assert!(init(Some("text"), "warn").is_ok());
        assert!(is_initialized());
    }

    #[test]
    fn test_fallback_filter() {
        // Invalid directives fall back to info instead of panicking
        let _filter = fallback_filter("dcontainer=@@");
        let _filter = fallback_filter("dcontainer=debug,dcontainer_core=trace");
    }
}
