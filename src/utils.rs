use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Escapes special characters in strings for display
pub fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            '\\' => vec!['\\', '\\'],
            '"' => vec!['\\', '"'],
            c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
            c => vec![c],
        })
        .collect()
}

/// Escapes and cuts a string down to at most `max_len` characters, marking
/// the cut with an ellipsis.
pub fn print_safe(s: &str, max_len: usize) -> String {
    let escaped = escape_string(s);
    if escaped.chars().count() <= max_len {
        return escaped;
    }
    let mut ret: String = escaped.chars().take(max_len.saturating_sub(1)).collect();
    ret.push('…');
    ret
}

/// Formats bytes into human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Spinner for one phase of work. Reports the elapsed time when dropped.
pub struct Timer {
    message: String,
    start: Instant,
    bar: ProgressBar,
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.bar
            .finish_with_message(format!("{} ({:.2?})", self.message, self.elapsed()));
    }
}

pub fn start_timer(message: String) -> Timer {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.clone());
    bar.enable_steady_tick(Duration::from_millis(100));
    Timer {
        message,
        start: Instant::now(),
        bar,
    }
}
