//! Time formatting helpers.

/// Format a span of seconds coarsely, e.g. `3h 12m`.
pub fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        3600..=86399 => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d {}h", secs / 86400, (secs % 86400) / 3600),
    }
}

/// Format a session countdown as `mm:ss`; `--:--` before it is known.
pub fn format_countdown(secs: Option<u64>) -> String {
    match secs {
        Some(secs) => format!("{:02}:{:02}", secs / 60, secs % 60),
        None => "--:--".to_string(),
    }
}
