use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset. Route selection and swap execution keep their
/// `info!` lines, chatty transport crates are held to warnings.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "info",
    "swaprouter_backend::routing=info",
    "swaprouter_backend::execution=info",
    "swaprouter_backend::dexes=info",
    "tower_http=info",
    "hyper=warn",
    "reqwest=warn",
    "alloy_transport_http=warn",
];

pub fn default_log_filter() -> String {
    DEFAULT_DIRECTIVES.join(",")
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter()));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .try_init();

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
