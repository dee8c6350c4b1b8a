use simplelog::{Config, LevelFilter, SimpleLogger};

pub fn init(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = SimpleLogger::init(level, Config::default());
}
