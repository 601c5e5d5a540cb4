use std::path::Path;
use std::sync::Mutex;

/// Progress and result messages from commands, for both CLI and library callers
pub trait OutputHandler: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    fn info(&self, message: &str);

    fn warning(&self, message: &str);

    /// Section title, e.g. one per backup stage
    fn heading(&self, message: &str);

    /// Action + subject, e.g. ("Dumping", "schema")
    fn status(&self, action: &str, message: &str);

    /// A file written by the command
    fn artifact(&self, label: &str, path: &Path) {
        self.status(label, &path.display().to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Success,
    Error,
    Info,
    Warning,
    Heading,
    Status,
}

/// Output handler that collects messages for inspection
#[derive(Debug, Default)]
pub struct LibraryOutputHandler {
    messages: Mutex<Vec<(OutputLevel, String)>>,
}

impl LibraryOutputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(OutputLevel, String)> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages of one level, in order
    pub fn messages_at(&self, level: OutputLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    fn add_message(&self, level: OutputLevel, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

impl OutputHandler for LibraryOutputHandler {
    fn success(&self, message: &str) {
        self.add_message(OutputLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.add_message(OutputLevel::Error, message);
    }

    fn info(&self, message: &str) {
        self.add_message(OutputLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.add_message(OutputLevel::Warning, message);
    }

    fn heading(&self, message: &str) {
        self.add_message(OutputLevel::Heading, message);
    }

    fn status(&self, action: &str, message: &str) {
        self.add_message(OutputLevel::Status, &format!("{} {}", action, message));
    }
}

/// CLI output handler that prints to stdout with colors
#[cfg(feature = "cli")]
pub struct CliOutputHandler;

#[cfg(feature = "cli")]
impl OutputHandler for CliOutputHandler {
    fn success(&self, message: &str) {
        use owo_colors::OwoColorize;
        println!("{} {}", "✓".green(), message);
    }

    fn error(&self, message: &str) {
        use owo_colors::OwoColorize;
        eprintln!("{} {}", "✗".red(), message);
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        use owo_colors::OwoColorize;
        println!("{} {}", "⚠".yellow(), message);
    }

    fn heading(&self, message: &str) {
        use owo_colors::OwoColorize;
        println!("\n{}", message.bold());
    }

    fn status(&self, action: &str, message: &str) {
        use owo_colors::OwoColorize;
        println!("{:>12} {}", action.green().bold(), message);
    }

    fn artifact(&self, label: &str, path: &Path) {
        use owo_colors::OwoColorize;
        println!("{:>12} {}", label.cyan().bold(), path.display().to_string().dimmed());
    }
}

/// Output handler that discards everything
pub struct SilentOutputHandler;

impl OutputHandler for SilentOutputHandler {
    fn success(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn heading(&self, _message: &str) {}
    fn status(&self, _action: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_output_handler() {
        let handler = LibraryOutputHandler::new();

        handler.heading("Backup 20250629_161751");
        handler.status("Dumping", "schema");
        handler.warning("No statement found for type public.mood");
        handler.artifact("Wrote", Path::new("schemas/current_schema.sql"));
        handler.success("Backup complete");

        let messages = handler.messages();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1], (OutputLevel::Status, "Dumping schema".to_string()));
        assert_eq!(
            messages[3],
            (OutputLevel::Status, "Wrote schemas/current_schema.sql".to_string())
        );
        assert_eq!(
            handler.messages_at(OutputLevel::Warning),
            vec!["No statement found for type public.mood".to_string()]
        );
    }

    #[test]
    fn test_library_handler_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let handler = Arc::new(LibraryOutputHandler::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let handler = Arc::clone(&handler);
                thread::spawn(move || handler.info(&format!("Message from thread {}", i)))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(handler.messages_at(OutputLevel::Info).len(), 10);
    }

    #[test]
    fn test_silent_output_handler() {
        let handler = SilentOutputHandler;
        handler.success("ignored");
        handler.artifact("Wrote", Path::new("ignored.sql"));
    }
}
