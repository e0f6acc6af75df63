use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// Dependency modules whose log output drowns out a sync run's own progress.
/// Suppressed at every verbosity below Trace.
const NOISY_MODULES: &[&str] = &["sqlx", "sea_orm", "tracing", "hyper", "reqwest", "rustls"];

pub struct Logger {}

impl Logger {
    /// Initializes the global terminal logger from the parsed `Config`.
    ///
    /// Trace shows everything, dependencies included; any other level keeps
    /// only this workspace's own modules.
    pub fn init_logger(config: &Config) {
        let show_dependencies = config.log_level_filter == LevelFilter::Trace;
        let log_config = Self::build_log_config(show_dependencies);

        simplelog::TermLogger::init(
            Self::convert_level_filter(config.log_level_filter),
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
        .expect("Failed to start simplelog");
    }

    /// Converts log::LevelFilter to simplelog::LevelFilter.
    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn build_log_config(show_dependencies: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if !show_dependencies {
            for module in NOISY_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noisy_database_and_http_modules_are_filtered() {
        for module in ["sqlx", "sea_orm", "hyper", "reqwest", "rustls"] {
            assert!(
                NOISY_MODULES.contains(&module),
                "{module} should be filtered"
            );
        }
    }

    #[test]
    fn build_log_config_handles_both_modes() {
        let _quiet = Logger::build_log_config(false);
        let _verbose = Logger::build_log_config(true);
    }

    #[test]
    fn convert_level_filter_preserves_every_level() {
        assert_eq!(
            Logger::convert_level_filter(LevelFilter::Info) as u8,
            simplelog::LevelFilter::Info as u8
        );
        assert_eq!(
            Logger::convert_level_filter(LevelFilter::Trace) as u8,
            simplelog::LevelFilter::Trace as u8
        );
    }
}
