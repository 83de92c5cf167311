//! Command routing for the assistant endpoint
//!
//! Incoming text is normalised (trimmed, lower-cased) and matched against a
//! small set of file commands. Anything that is not a command goes to the
//! language model.

use std::sync::Arc;

use crate::providers::Provider;
use crate::workspace::{FileWorkspace, WorkspaceError};

use super::classify;

/// MIME types `read` will return as text
const READABLE_TYPES: &[&str] = &["text/plain", "application/json", "text/csv"];

const LIST_ALIASES: &[&str] = &["list", "list files", "show my files"];

const MODEL_PREAMBLE: &str = "You are an AI file assistant.";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Read(String),
    Rename { from: String, to: String },
    Move { file: String, folder: String },
    Categorize(String),
    Tag(String),
    Summarize(String),
    List,
    Usage(&'static str),
    Prompt(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let input = text.trim().to_lowercase();

        if let Some(name) = input.strip_prefix("read ") {
            return Command::Read(name.trim().to_string());
        }
        if let Some(rest) = input.strip_prefix("rename ") {
            return match split_pair(rest) {
                Some((from, to)) => Command::Rename { from, to },
                None => Command::Usage("Usage: rename <old_name> to <new_name>"),
            };
        }
        if let Some(rest) = input.strip_prefix("move ") {
            return match split_pair(rest) {
                Some((file, folder)) => Command::Move { file, folder },
                None => Command::Usage("Usage: move <file_name> to <folder_name>"),
            };
        }
        if let Some(name) = input.strip_prefix("categorize ") {
            return Command::Categorize(name.trim().to_string());
        }
        if let Some(name) = input.strip_prefix("tag ") {
            return Command::Tag(name.trim().to_string());
        }
        if let Some(name) = input.strip_prefix("summarize ") {
            return Command::Summarize(name.trim().to_string());
        }
        if LIST_ALIASES.contains(&input.as_str()) {
            return Command::List;
        }

        Command::Prompt(input)
    }
}

/// `"a to b"` → `("a", "b")`; anything other than exactly one separator fails
fn split_pair(rest: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = rest.split(" to ").collect();
    match parts.as_slice() {
        [left, right] => Some((left.trim().to_string(), right.trim().to_string())),
        _ => None,
    }
}

pub struct CommandRouter {
    workspace: Arc<FileWorkspace>,
    model: Provider,
}

impl CommandRouter {
    pub fn new(workspace: Arc<FileWorkspace>, model: Provider) -> Self {
        Self { workspace, model }
    }

    /// Produce the reply text for one message
    pub async fn handle(&self, text: &str) -> Result<String, CommandError> {
        let command = Command::parse(text);
        tracing::debug!("Handling command: {:?}", command);

        match command {
            Command::Read(name) => self.read(&name).await,
            Command::Rename { from, to } => self.rename(&from, &to).await,
            Command::Move { file, folder } => self.move_file(&file, &folder).await,
            Command::Categorize(name) => Ok(match self.content_of(&name).await? {
                Some(content) => format!("Suggested category: {}", classify::categorize(&content)),
                None => not_found(&name),
            }),
            Command::Tag(name) => Ok(match self.content_of(&name).await? {
                Some(content) => format!("Tags: {}", classify::extract_tags(&content).join(", ")),
                None => not_found(&name),
            }),
            Command::Summarize(name) => Ok(match self.content_of(&name).await? {
                Some(content) => {
                    self.ask_model(&format!("Summarize this:\n{}", content))
                        .await
                }
                None => not_found(&name),
            }),
            Command::List => {
                let entries = self.workspace.list().await?;
                Ok(entries
                    .into_iter()
                    .map(|f| f.name)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Usage(usage) => Ok(usage.to_string()),
            Command::Prompt(prompt) => Ok(self.ask_model(&prompt).await),
        }
    }

    async fn read(&self, name: &str) -> Result<String, CommandError> {
        let Some(entry) = self.workspace.find(name, false).await? else {
            return Ok(not_found(name));
        };

        let mime = entry.mime_type();
        if !READABLE_TYPES.contains(&mime.as_str()) {
            return Ok(format!(
                "Cannot display file '{}' (type: {}) as plain text.",
                name, mime
            ));
        }

        Ok(self.workspace.read_text(&entry).await?)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<String, CommandError> {
        let Some(entry) = self.workspace.find(from, false).await? else {
            return Ok(not_found(from));
        };

        let renamed = self.workspace.rename(&entry, to).await?;
        Ok(format!("File renamed to: {}", renamed.name))
    }

    async fn move_file(&self, file: &str, folder: &str) -> Result<String, CommandError> {
        let entry = self.workspace.find(file, false).await?;
        let target = self.workspace.find(folder, true).await?;

        match (entry, target) {
            (None, _) => Ok(not_found(file)),
            (_, None) => Ok(format!("Folder '{}' not found.", folder)),
            (Some(entry), Some(target)) => {
                self.workspace.move_into(&entry, &target).await?;
                Ok("File moved to folder.".to_string())
            }
        }
    }

    /// Text of the first file matching `name`, if any
    async fn content_of(&self, name: &str) -> Result<Option<String>, CommandError> {
        match self.workspace.find(name, false).await? {
            Some(entry) => Ok(Some(self.workspace.read_text(&entry).await?)),
            None => Ok(None),
        }
    }

    /// Model failures are reported as a reply, not as an error
    async fn ask_model(&self, prompt: &str) -> String {
        match self
            .model
            .generate(&format!("{} {}", MODEL_PREAMBLE, prompt))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Model request failed: {}", e);
                format!("Model error: {}", e)
            }
        }
    }
}

fn not_found(name: &str) -> String {
    format!("File '{}' not found.", name)
}
