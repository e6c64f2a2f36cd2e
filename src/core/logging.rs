use log::LevelFilter;

use crate::types::config::{colors_enabled, config};

/// Installs the global logger. Level and color come from the already
/// initialized config. Called once from `run_main`; a second call (as
/// happens under the test harness) leaves the existing logger in place.
pub fn init_logging() {
    let level = config()
        .log()
        .level()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);

    if let Some(force) = config().log().color() {
        console::set_colors_enabled(force);
    }
    let use_color = colors_enabled();

    let _ = fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = chrono::Local::now().format("%H:%M:%S");
            let level = if use_color {
                colored_level(record.level())
            } else {
                record.level().to_string()
            };
            out.finish(format_args!("{timestamp} {level:<5} {message}"))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply();
}

fn colored_level(level: log::Level) -> String {
    let styled = match level {
        log::Level::Error => console::style(level).red(),
        log::Level::Warn => console::style(level).yellow(),
        log::Level::Info => console::style(level).green(),
        log::Level::Debug => console::style(level).cyan(),
        log::Level::Trace => console::style(level).dim(),
    };
    styled.to_string()
}
