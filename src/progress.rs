//! Progress sinks for import runs. Reporters are best-effort: they never
//! return errors and swallow any I/O failure of their own.

use crate::constants::PROGRESS_MESSAGE_MAX;
use crate::error::ImportError;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: usize, message: &str);
    fn update(&self, current: usize, message: &str);
    fn finish(&self, message: &str);
    fn error(&self, err: &ImportError);
}

/// Reporter that drops every event. Used by the HTTP driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReporter;

impl ProgressReporter for NoOpReporter {
    fn start(&self, _total: usize, _message: &str) {}
    fn update(&self, _current: usize, _message: &str) {}
    fn finish(&self, _message: &str) {}
    fn error(&self, _err: &ImportError) {}
}

/// Cut `s` to at most `max` characters, ending with "..." when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// ANSI progress bar on stderr for the command-line driver.
pub struct TerminalReporter {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A reporter that tracks state but draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }

    pub fn position(&self) -> Option<u64> {
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|bar| bar.position())
    }
}

impl ProgressReporter for TerminalReporter {
    fn start(&self, total: usize, message: &str) {
        let bar = if self.hidden {
            ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden())
        } else {
            let _ = writeln!(std::io::stdout(), "{message}");
            ProgressBar::new(total as u64)
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg:.cyan} [{bar:50.green/dim}] {pos}/{len}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message("Importing...");
        *self.bar.lock().unwrap_or_else(PoisonError::into_inner) = Some(bar);
    }

    fn update(&self, current: usize, message: &str) {
        let message = truncate(message, PROGRESS_MESSAGE_MAX);
        self.with_bar(|bar| {
            bar.set_message(message);
            bar.set_position(current as u64);
        });
    }

    fn finish(&self, message: &str) {
        self.with_bar(|bar| bar.finish());
        if !self.hidden {
            let _ = writeln!(std::io::stdout(), "\n{message}");
        }
    }

    fn error(&self, err: &ImportError) {
        if self.hidden {
            return;
        }
        let line = format!("\x1b[31mError: {err}\x1b[0m");
        let guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(bar) => bar.suspend(|| {
                let _ = writeln!(std::io::stderr(), "{line}");
            }),
            None => {
                let _ = writeln!(std::io::stderr(), "{line}");
            }
        }
    }
}

/// An event seen by a [`CollectingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Start { total: usize, message: String },
    Update { current: usize, message: String },
    Finish { message: String },
    Error { message: String },
}

/// Reporter that keeps every event in memory, for callers that want to
/// inspect or replay the run afterwards.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ProgressReporter for CollectingReporter {
    fn start(&self, total: usize, message: &str) {
        self.push(ProgressEvent::Start {
            total,
            message: message.to_string(),
        });
    }

    fn update(&self, current: usize, message: &str) {
        self.push(ProgressEvent::Update {
            current,
            message: message.to_string(),
        });
    }

    fn finish(&self, message: &str) {
        self.push(ProgressEvent::Finish {
            message: message.to_string(),
        });
    }

    fn error(&self, err: &ImportError) {
        self.push(ProgressEvent::Error {
            message: err.to_string(),
        });
    }
}
