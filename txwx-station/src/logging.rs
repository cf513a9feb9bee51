//! Logger setup shared by both binaries.

use log::LevelFilter;

/// Level for the station's own modules given the `-v` count.
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialise `env_logger`.
///
/// When `RUST_LOG` is set it takes full control. Otherwise other crates
/// log at warn and the `txwx_*` modules at the level chosen by `-v`.
pub fn init_logging(verbose: u8) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
        return;
    }

    let level = level_for(verbose);
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter_module("txwx_core", level)
        .filter_module("txwx_station", level)
        .filter_module("txwx", level)
        .filter_module("rxwx", level)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::Info);
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(2), LevelFilter::Trace);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
