use std::sync::Once;

use env_logger::Builder;
use log::LevelFilter;

static INIT: Once = Once::new();

// Surfaces rehash/clear logging when tests run with RUST_LOG set.
pub fn init_logger() {
    INIT.call_once_force(|_| {
        let mut builder = Builder::new();
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("chained_map", LevelFilter::Debug)
            .is_test(true)
            .parse_default_env();
        let _ = builder.try_init();
    });
}
