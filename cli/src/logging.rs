use tracing_subscriber::EnvFilter;

use crate::args::LogArgs;

/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logger(args: &LogArgs) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
