use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
The following is a conversation with an AI assistant. The assistant is helpful, \
creative, clever, and very friendly. It answers clearly, keeps replies concise \
unless asked for detail, and says so when it does not know something.";

#[derive(Debug)]
pub enum PromptError {
    Empty(String),
    IoError(std::io::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Empty(path) => write!(f, "System prompt file '{}' is empty", path),
            PromptError::IoError(e) => write!(f, "System prompt file IO error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

/// Fixed instruction prepended to every conversation. Never echoed to callers
/// and never logged; `Debug` only reports its length.
#[derive(Clone, PartialEq, Eq)]
pub struct SystemPrompt(String);

impl SystemPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPrompt").field("len", &self.0.len()).finish()
    }
}

pub fn load_system_prompt<P: AsRef<Path>>(path: Option<P>) -> Result<SystemPrompt, PromptError> {
    let Some(path) = path else {
        info!("Using built-in system prompt");
        return Ok(SystemPrompt::default());
    };
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PromptError::Empty(path.display().to_string()));
    }
    info!("Loaded system prompt from '{}' ({} bytes)", path.display(), text.len());
    Ok(SystemPrompt::new(text))
}
