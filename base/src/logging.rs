
use log::LevelFilter;

use std::str::FromStr;

/// Install `env_logger` as the global logger.
///
/// `level` comes from sample configuration, `RUST_LOG` still takes precedence when it is set.
pub fn init_logger(level: Option<&str>) {

    let filter = parse_level(level);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(filter)
        .format_timestamp_millis()
        .parse_default_env();

    // a second initialization(e.g. in tests) is not an error for samples.
    let _ = builder.try_init();
}

pub fn parse_level(level: Option<&str>) -> LevelFilter {

    level.and_then(|l| LevelFilter::from_str(l).ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level(None), LevelFilter::Info);
        assert_eq!(parse_level(Some("verbose-ish")), LevelFilter::Info);
        assert_eq!(parse_level(Some("debug")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("WARN")), LevelFilter::Warn);
    }
}
