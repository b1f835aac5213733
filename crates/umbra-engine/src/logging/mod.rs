//! `env_logger` setup for binaries built on the engine.
//!
//! The engine itself only uses the `log` macros. Renderers log texture
//! uploads, unit evictions and context restores at `debug`, and the first
//! occurrence of each unknown texture at `warn`.

use std::sync::Once;

use log::LevelFilter;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when neither `filter` nor `RUST_LOG` is set.
    pub level: LevelFilter,
    /// `env_logger` directives such as `"umbra_engine=debug,wgpu=warn"`.
    /// Takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
            timestamps: true,
        }
    }
}

/// Installs the global logger. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(config.level);
        // wgpu logs every pipeline and buffer at info
        for module in ["wgpu_core", "wgpu_hal", "naga"] {
            builder.filter_module(module, LevelFilter::Warn);
        }
        if let Some(directives) = config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            builder.parse_filters(&directives);
        }
        builder.write_style(config.write_style);
        if !config.timestamps {
            builder.format_timestamp(None);
        }
        // a test harness or host may have installed a logger already
        if builder.try_init().is_err() {
            return;
        }
        log::debug!("logger installed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig { timestamps: false, ..Default::default() };
        init_logging(config.clone());
        init_logging(config);
        log::info!("still logging");
    }
}
