use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

fn default_directives(debug: bool) -> &'static str {
    if debug {
        "warn,moo=debug,moo_cli=debug"
    } else {
        "warn"
    }
}

/// Send logs to stderr. RUST_LOG overrides the default filter.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
