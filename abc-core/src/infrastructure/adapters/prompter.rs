// abc-core/src/infrastructure/adapters/prompter.rs

use std::io::{BufRead, IsTerminal, Write};

use crate::AbcError;
use crate::ports::Prompter;

/// Real prompter: writes the question to stdout, reads one line from
/// stdin.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, message: &str) -> Result<String, AbcError> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }
}

/// Scripted prompter for tests: pops canned responses in order.
pub struct ScriptedPrompter {
    responses: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, _message: &str) -> Result<String, AbcError> {
        if self.responses.is_empty() {
            return Err(AbcError::InternalError(
                "scripted prompter ran out of responses".to_string(),
            ));
        }
        Ok(self.responses.remove(0))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
