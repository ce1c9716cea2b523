//! Scripted generator for tests and offline runs.
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::Generator;
use super::prompt::extract_context;
use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
enum Reply {
    /// Answer with the prompt's context block.
    Echo,
    Fixed(String),
    Fail(String),
}

/// A [`Generator`] that never leaves the process.
#[derive(Debug)]
pub struct MockGenerator {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Reply with the retrieved context, which keeps answers grounded in the corpus.
    #[must_use]
    pub fn echo() -> Self {
        Self::with_reply(Reply::Echo)
    }

    #[must_use]
    pub fn fixed(answer: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fixed(answer.into()))
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fail(message.into()))
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }

        match &self.reply {
            Reply::Echo => Ok(extract_context(prompt).unwrap_or(prompt).to_string()),
            Reply::Fixed(answer) => Ok(answer.clone()),
            Reply::Fail(message) => Err(RagError::Generation(message.clone())),
        }
    }
}
