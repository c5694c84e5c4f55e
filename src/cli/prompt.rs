//! Interactive prompts for the install flow.
//!
//! Prompting is behind a trait so install logic can be tested without a
//! terminal. Prompt failures (no tty, closed stdin) resolve to the
//! default answer rather than aborting the install.

use dialoguer::{Confirm, MultiSelect};

pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&self, message: &str, default: bool) -> bool;

    /// Offer a list of items, all preselected, and return the chosen
    /// indices.
    fn multi_select(&self, message: &str, items: &[String]) -> Vec<usize>;
}

/// Terminal-backed prompter.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .unwrap_or(default)
    }

    fn multi_select(&self, message: &str, items: &[String]) -> Vec<usize> {
        let defaults = vec![true; items.len()];
        MultiSelect::new()
            .with_prompt(message)
            .items(items)
            .defaults(&defaults)
            .interact()
            .unwrap_or_else(|_| (0..items.len()).collect())
    }
}

/// Fixed-answer prompter for `--yes` runs and tests.
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, _message: &str, _default: bool) -> bool {
        true
    }

    fn multi_select(&self, _message: &str, items: &[String]) -> Vec<usize> {
        (0..items.len()).collect()
    }
}

#[cfg(test)]
pub struct ScriptedPrompter {
    pub confirm_answer: bool,
    pub selection: Vec<usize>,
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&self, _message: &str, _default: bool) -> bool {
        self.confirm_answer
    }

    fn multi_select(&self, _message: &str, _items: &[String]) -> Vec<usize> {
        self.selection.clone()
    }
}
