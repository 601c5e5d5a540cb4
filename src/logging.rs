use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::{
    fmt::{format::FmtSpan, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the logging and error reporting infrastructure
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    #[cfg(feature = "cli")]
    color_eyre::install()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // stderr keeps stdout clean for `extract --json` style piping
    let is_terminal = std::io::stderr().is_terminal();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(is_terminal)
        .with_timer(UtcTime::rfc_3339())
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Filter used when RUST_LOG is not set
pub fn default_directive(verbosity: u8) -> String {
    format!("pgphase={}", level_for(verbosity))
}

#[macro_export]
macro_rules! log_error {
    ($err:expr) => {
        tracing::error!(
            error = %$err,
            "Operation failed"
        );
        if let Some(suggestion) = $crate::error::suggest_fix(&$err) {
            tracing::info!("{}", suggestion);
        }
    };
    ($err:expr, $($key:tt = $value:expr),+ $(,)?) => {
        tracing::error!(
            error = %$err,
            $($key = $value,)+
            "Operation failed"
        );
        if let Some(suggestion) = $crate::error::suggest_fix(&$err) {
            tracing::info!("{}", suggestion);
        }
    };
}

/// Log a written artifact with its size and checksum
#[macro_export]
macro_rules! log_artifact {
    ($label:expr, $record:expr) => {
        tracing::info!(
            artifact = $label,
            path = %$record.path.display(),
            lines = $record.lines,
            bytes = $record.size_bytes,
            sha256 = %$record.sha256,
            "Artifact written"
        );
    };
}

#[macro_export]
macro_rules! log_stage {
    ($stage:expr, $($arg:tt)+) => {
        tracing::info!(stage = $stage, $($arg)+);
    };
}

/// Format output for CLI with colors
#[cfg(feature = "cli")]
pub mod output {
    use console::{style, Emoji};
    use std::fmt::Display;

    static CHECKMARK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
    static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
    static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
    static WARNING: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

    pub fn success(message: impl Display) {
        println!("{} {}", style(CHECKMARK).green(), message);
    }

    pub fn error(message: impl Display) {
        eprintln!("{} {}", style(CROSS).red(), style(message).red());
    }

    pub fn warning(message: impl Display) {
        println!("{} {}", style(WARNING).yellow(), style(message).yellow());
    }

    pub fn step(message: impl Display) {
        println!("{} {}", style(ARROW).cyan(), message);
    }

    pub fn suggestion(message: impl Display) {
        eprintln!("  {} {}", style("hint:").cyan().bold(), message);
    }

    pub fn header(message: impl Display) {
        println!("\n{}", style(message).bold().underlined());
    }
}

/// Helper to format durations in human-readable format
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{:03}s", secs, millis)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Byte counts as B / KB / MB with one decimal
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{} B", bytes)
    } else if bytes_f < KB * KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{:.1} MB", bytes_f / (KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.500s");
        assert_eq!(format_duration(Duration::from_secs(605)), "10m 5s");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "pgphase=WARN");
        assert_eq!(default_directive(2), "pgphase=DEBUG");
        assert_eq!(default_directive(9), "pgphase=TRACE");
    }
}
