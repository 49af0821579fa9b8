/// Initialise logging from `RUST_LOG`, falling back to the configured level
pub fn setup_logger(default_level: &str) {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    let is_info = filters.eq_ignore_ascii_case("info");

    let mut builder = env_logger::Builder::new();
    builder.format_timestamp_millis().parse_filters(&filters);

    if is_info {
        // decoder internals are chatty at info
        builder
            .filter_module("symphonia_core", log::LevelFilter::Warn)
            .filter_module("symphonia_bundle_mp3", log::LevelFilter::Warn)
            .filter_module("symphonia_format_isomp4", log::LevelFilter::Warn);
    }

    builder.init();
}
