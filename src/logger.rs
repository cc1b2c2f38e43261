//! Line-oriented sink for job status messages.

use std::fmt;
use std::sync::Arc;

use console::style;

/// Receives the human-readable status lines a job emits while running
/// (start notice, stop notice, final elapsed-time summary).
///
/// Cheap to clone; clones share the same sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

impl Logger {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Print each line to standard output.
    pub fn stdout() -> Self {
        Self::new(|line| println!("{line}"))
    }

    /// Print to standard output with the leading `[name]` tag highlighted.
    /// Colors are dropped automatically when stdout is not a terminal.
    pub fn styled() -> Self {
        Self::new(|line| match line.split_once("] ") {
            Some((tag, rest)) if line.starts_with('[') => {
                println!("{} {rest}", style(format!("{tag}]")).cyan().bold());
            }
            _ => println!("{}", style(line).dim()),
        })
    }

    /// Discard every line.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn log(&self, line: &str) {
        (self.sink)(line);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
