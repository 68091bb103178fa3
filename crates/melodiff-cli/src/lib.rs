//! Shared plumbing for the melodiff command-line tools

pub mod input;
pub mod output;

/// Initialize logger
///
/// Default: no logs (clean JSON on stdout for parsing).
/// Verbose: Info level on stderr.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
