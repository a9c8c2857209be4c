//! # User Prompts
//!
//! Narrow interface to whatever shows messages to the pilot.
//!
//! The instrument UI is not part of this crate; components that need to ask a
//! yes/no question or surface a status message go through [`UserPrompt`].

use tracing::{info, warn};

/// Yes/no confirmation and status message sink
#[cfg_attr(test, mockall::automock)]
pub trait UserPrompt: Send + Sync {
    /// Ask a yes/no question, `true` meaning yes
    fn confirm(&self, caption: &str, message: &str) -> bool;

    /// Show a message that needs no answer
    fn message(&self, caption: &str, message: &str);
}

/// Headless prompt: messages go to the log, questions get a fixed answer
#[derive(Debug, Clone, Copy)]
pub struct LogPrompt {
    answer: bool,
}

impl LogPrompt {
    /// Prompt that answers every question with `answer`
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

impl UserPrompt for LogPrompt {
    fn confirm(&self, caption: &str, message: &str) -> bool {
        info!(caption, answer = self.answer, "{}", message);
        self.answer
    }

    fn message(&self, caption: &str, message: &str) {
        warn!(caption, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_prompt_answers() {
        assert!(LogPrompt::new(true).confirm("Logger", "Declare Task?"));
        assert!(!LogPrompt::new(false).confirm("Logger", "Declare Task?"));
    }
}
