//! Status messages on stderr.
//!
//! Generated text owns stdout so it can be piped; everything else goes here.

use crossterm::style::Stylize;
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR: AtomicBool = AtomicBool::new(true);

/// Enable or disable styling for status messages.
pub fn set_color(enabled: bool) {
    COLOR.store(enabled, Ordering::Relaxed);
}

pub fn color_enabled() -> bool {
    COLOR.load(Ordering::Relaxed)
}

fn label(text: &str, paint: fn(&str) -> String) -> String {
    if color_enabled() {
        paint(text)
    } else {
        text.to_string()
    }
}

pub fn error(message: impl AsRef<str>) {
    let tag = label("Error:", |s| s.red().bold().to_string());
    eprintln!("{} {}", tag, message.as_ref());
}

pub fn warning(message: impl AsRef<str>) {
    let tag = label("Warning:", |s| s.yellow().bold().to_string());
    eprintln!("{} {}", tag, message.as_ref());
}

pub fn info(message: impl AsRef<str>) {
    let tag = label("Info:", |s| s.blue().bold().to_string());
    eprintln!("{} {}", tag, message.as_ref());
}

pub fn success(message: impl AsRef<str>) {
    let tag = label("Success:", |s| s.green().bold().to_string());
    eprintln!("{} {}", tag, message.as_ref());
}

/// A bold heading line, e.g. above a table.
pub fn heading(text: &str) -> String {
    label(text, |s| s.bold().to_string())
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;

    if bytes >= GB {
        format!("{:.1}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.0}MB", bytes as f64 / MB as f64)
    } else {
        format!("{}B", bytes)
    }
}
