use monitor_core::ModelFilter;

/// A line typed into the live dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Filter(ModelFilter),
    Refresh,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "" => InputCommand::Empty,
        "q" | "quit" | "exit" => InputCommand::Quit,
        "r" | "refresh" => InputCommand::Refresh,
        "all" => InputCommand::Filter(ModelFilter::all()),
        // Surrounding whitespace is dropped above; case is kept.
        "m" | "model" => InputCommand::Filter(ModelFilter::model(rest)),
        _ => InputCommand::Unknown(line.to_string()),
    }
}
