use serde::{Deserialize, Serialize};
use slog::{o, Drain, Logger};

pub use slog;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingSettings {
    pub stdout: bool,
    pub level: String,
    pub name: String,
}

impl LoggingSettings {
    pub fn new(name: &str) -> Self {
        Self {
            stdout: true,
            level: String::from("info"),
            name: name.to_string(),
        }
    }
}

pub fn init_log(config: &LoggingSettings) -> Logger {
    let level = match config.level.as_str() {
        "trace" => slog::Level::Trace,
        "debug" => slog::Level::Debug,
        "info" => slog::Level::Info,
        "warning" => slog::Level::Warning,
        "error" => slog::Level::Error,
        "critical" => slog::Level::Critical,
        st => panic!("Unknown logging level {:?}", st),
    };

    if config.stdout {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        let drain = slog::LevelFilter::new(drain, level).fuse();
        Logger::root(drain, o!("name" => config.name.clone()))
    } else {
        Logger::root(slog::Discard, o!("name" => config.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_discard_logger() {
        let settings = LoggingSettings {
            stdout: false,
            level: String::from("debug"),
            name: String::from("test"),
        };
        let logger = init_log(&settings);
        slog::info!(logger, "no drain attached");
    }
}
