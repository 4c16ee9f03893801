//! Tracing subscriber setup shared by the server and CLI commands.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Directive added to whatever `RUST_LOG` selects.
pub const DEFAULT_DIRECTIVE: &str = "rental_utilities=info";

/// Builds the log filter from `RUST_LOG` plus [`DEFAULT_DIRECTIVE`].
pub fn env_filter() -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    match DEFAULT_DIRECTIVE.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Installs the global fmt subscriber writing to stderr, leaving stdout to
/// command output. Later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
