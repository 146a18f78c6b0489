//! Terminal presentation of the committed view state.

use std::fmt::{self, Write};

use colored::Colorize;
use monitor_core::{ChartPoint, Event, StatsSnapshot, ViewState};

const BAR_WIDTH: usize = 40;
const RULE_WIDTH: usize = 100;

pub fn format_cost(cost: Option<f64>) -> String {
    match cost {
        Some(value) if value > 0.0 => format!("${:.6}", value),
        _ => "$0.00".to_string(),
    }
}

pub fn format_latency(latency_ms: Option<f64>) -> String {
    match latency_ms {
        Some(value) if value > 0.0 => format!("{}ms", value.round() as u64),
        _ => "0ms".to_string(),
    }
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.clamp(1, BAR_WIDTH))
}

pub fn render_dashboard(state: &ViewState) -> String {
    if state.loading {
        return "Loading...".dimmed().to_string();
    }

    let mut out = String::new();
    // Writing into a String cannot fail.
    if write_dashboard(&mut out, state).is_err() {
        log::warn!("Dashboard rendering was cut short");
    }
    out
}

fn write_dashboard(out: &mut String, state: &ViewState) -> fmt::Result {
    let stats = state.stats.clone().unwrap_or_default();

    write_header(out, state, &stats)?;
    write_kpis(out, state, &stats)?;
    write_chart(out, "Latency Over Time", &state.metrics.latency_series, "ms")?;
    write_chart(out, "Token Usage", &state.metrics.token_series, "")?;
    write_events(out, &state.events)?;
    write_footer(out, state)
}

fn write_header(out: &mut String, state: &ViewState, stats: &StatsSnapshot) -> fmt::Result {
    writeln!(
        out,
        "{}  {} {} {} requests tracked",
        "LLM Monitor".bold(),
        "Live".green(),
        "•".dimmed(),
        stats.total_events
    )?;

    let mut filter_line = format!("Filter by Model: {}", state.selected_filter);
    if state.selected_filter != state.events_filter {
        write!(filter_line, " (showing {}, refreshing)", state.events_filter)?;
    }
    writeln!(out, "{}", filter_line.cyan())?;

    if let Some(error) = &state.last_error {
        writeln!(out, "{}", format!("Last refresh failed: {}", error).red())?;
    }
    writeln!(out)
}

fn write_kpis(out: &mut String, state: &ViewState, stats: &StatsSnapshot) -> fmt::Result {
    let cards = [
        ("Total Events", stats.total_events.to_string()),
        ("Unique Models", stats.unique_models.to_string()),
        ("Avg Latency", format_latency(stats.avg_latency_ms)),
        ("Total Cost", format_cost(stats.total_cost)),
        ("P90 Latency", format_latency(Some(state.metrics.p90_latency_ms))),
        ("P95 Latency", format_latency(Some(state.metrics.p95_latency_ms))),
    ];

    for (title, value) in cards {
        writeln!(out, "  {:<14} {}", title.dimmed(), value.bold())?;
    }
    writeln!(out)
}

fn write_chart(out: &mut String, title: &str, points: &[ChartPoint], unit: &str) -> fmt::Result {
    writeln!(
        out,
        "{} {}",
        title.bold(),
        format!("(recent {} events)", points.len()).dimmed()
    )?;

    let max = points.iter().map(|p| p.value).fold(0.0, f64::max);
    for point in points {
        writeln!(
            out,
            "  {:<9} {:<width$} {}{}",
            point.label,
            bar(point.value, max),
            point.value.round() as u64,
            unit,
            width = BAR_WIDTH
        )?;
    }
    writeln!(out)
}

fn write_events(out: &mut String, events: &[Event]) -> fmt::Result {
    writeln!(out, "{}", format!("Recent Events ({})", events.len()).bold())?;
    writeln!(
        out,
        "  {:<6} {:<19} {:<26} {:>8} {:>7} {:>10}  {}",
        "ID", "Timestamp", "Model", "Latency", "Tokens", "Cost", "Prompt"
    )?;
    writeln!(out, "  {}", "─".repeat(RULE_WIDTH).dimmed())?;

    for event in events {
        writeln!(
            out,
            "  {:<6} {:<19} {:<26} {:>8} {:>7} {:>10}  {}",
            event.id,
            event
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            event.model,
            format!("{}ms", event.latency_ms.round() as u64),
            event.tokens_used,
            format_cost(event.estimated_cost),
            event.prompt_preview()
        )?;
    }
    writeln!(out)
}

fn write_footer(out: &mut String, state: &ViewState) -> fmt::Result {
    let models = if state.metrics.unique_models.is_empty() {
        "none".to_string()
    } else {
        state.metrics.unique_models.join(", ")
    };
    writeln!(out, "{} {}", "Models:".dimmed(), models)?;
    writeln!(
        out,
        "{}",
        "Commands: model <name> | all | refresh | quit".dimmed()
    )
}
