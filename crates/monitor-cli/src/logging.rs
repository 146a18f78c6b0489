use std::io::Write;

const MONITOR_TARGETS: [&str; 4] = ["llm_monitor", "monitor_core", "monitor_source", "monitor_poller"];

/// Filter used when `RUST_LOG` is unset. Our own crates log at `info`
/// (`debug` with `--debug`); HTTP internals stay at `warn`.
pub fn default_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        MONITOR_TARGETS
            .iter()
            .map(|target| format!("{target}={level}")),
    );
    directives.join(",")
}

/// Initialise env_logger on stderr. `RUST_LOG` takes precedence over `debug`.
pub fn init_logging(debug: bool) {
    let filter = default_filter(debug);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_scopes_level_to_monitor_crates() {
        assert_eq!(
            default_filter(false),
            "warn,llm_monitor=info,monitor_core=info,monitor_source=info,monitor_poller=info"
        );
        let debug = default_filter(true);
        assert!(debug.starts_with("warn,"));
        assert!(debug.contains("monitor_poller=debug"));
        assert!(!debug.contains("=info"));
    }
}
