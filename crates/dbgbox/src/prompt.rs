//! User prompts and commands triggered from them.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

/// A choice offered alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    pub title: String,
}

impl MessageItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Shows messages to the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Show an error with optional actions. Resolves to the chosen action, or
    /// `None` when the message was dismissed.
    async fn show_error_message(&self, message: &str, items: &[MessageItem])
    -> Option<MessageItem>;
}

/// Executes named commands.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute_command(&self, command: &str) -> Result<()>;
}

/// Prompts on stderr and reads the answer from stdin.
///
/// Without a terminal on stdin the message is printed and dismissed, unless
/// `assume_yes` picks the first action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter {
    assume_yes: bool,
}

impl ConsolePrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn show_error_message(
        &self,
        message: &str,
        items: &[MessageItem],
    ) -> Option<MessageItem> {
        let mut stderr = io::stderr();
        let _ = writeln!(stderr, "error: {message}");

        let first = items.first()?.clone();
        if self.assume_yes {
            return Some(first);
        }
        if !io::stdin().is_terminal() {
            return None;
        }

        let options: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(index, item)| format!("{}) {}", index + 1, item.title))
            .collect();
        let _ = write!(stderr, "{}  [1-{}/N] ", options.join("  "), items.len());
        let _ = stderr.flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await
        .ok()?
        .ok()?;

        let answer = answer.trim();
        let choice = match answer {
            "y" | "Y" | "yes" => Some(0),
            other => other.parse::<usize>().ok().and_then(|n| n.checked_sub(1)),
        };
        choice.and_then(|index| items.get(index).cloned())
    }
}

/// Executor that accepts every command without doing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommands;

#[async_trait]
impl CommandExecutor for NoopCommands {
    async fn execute_command(&self, command: &str) -> Result<()> {
        debug!("ignoring command {command}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_assume_yes_picks_first_item() {
        let prompter = ConsolePrompter::new(true);
        let add = MessageItem::new("Add Docker Files");
        let chosen = prompter
            .show_error_message("no configuration", std::slice::from_ref(&add))
            .await;
        assert_eq!(chosen, Some(add));
    }

    #[tokio::test]
    async fn test_no_items_means_dismissed() {
        let prompter = ConsolePrompter::new(true);
        assert_eq!(prompter.show_error_message("nothing to do", &[]).await, None);
    }
}
