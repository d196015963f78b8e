use ansi_term::Colour;
use env_logger::{Builder, Env};
use log::Level;
use std::io::{IsTerminal, Write};

const DEFAULT_FILTER: &str = "info";

/// Installs the global logger. Verbosity comes from `RUST_LOG`, `info` if unset.
pub fn init() {
    let colored = std::io::stderr().is_terminal();

    Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .format(move |buf, record| {
            let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%:z");

            writeln!(
                buf,
                "[{} {} {}] {}",
                timestamp,
                level_label(record.level(), colored),
                record.module_path().unwrap_or_default(),
                record.args()
            )
        })
        .init();
}

fn level_label(level: Level, colored: bool) -> String {
    if !colored {
        return level.to_string();
    }

    let colour = match level {
        Level::Error => Colour::Red,
        Level::Warn => Colour::Yellow,
        Level::Info => Colour::Green,
        Level::Debug => Colour::Blue,
        Level::Trace => Colour::Purple,
    };
    colour.paint(level.to_string()).to_string()
}
