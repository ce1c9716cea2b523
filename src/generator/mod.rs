//! Answer synthesis: prompt assembly and a single generative-model call.
pub mod mock;
pub mod openai;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::index::models::RetrievalResult;
use prompt::PromptTemplate;

/// A text-completion backend.
///
/// Implementations make exactly one model call per `generate` and return its
/// text output. Failures surface as [`RagError::Generation`]; nothing retries.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Turns a question plus retrieved chunks into a grounded answer.
#[derive(Clone)]
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn Generator>, template: PromptTemplate) -> Self {
        Self {
            generator,
            template,
        }
    }

    /// Build the prompt for `question` over `retrieved`.
    #[must_use]
    pub fn build_prompt(&self, question: &str, retrieved: &RetrievalResult) -> String {
        let context = retrieved
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.template.render(&context, question)
    }

    /// Invoke the model once and return its output verbatim.
    pub async fn synthesize(&self, question: &str, retrieved: &RetrievalResult) -> Result<String> {
        let prompt = self.build_prompt(question, retrieved);
        debug!(
            prompt_chars = prompt.len(),
            context_chunks = retrieved.len(),
            "invoking generative model"
        );

        let answer = self.generator.generate(&prompt).await?;
        if answer.trim().is_empty() {
            return Err(RagError::Generation(
                "model returned an empty answer".to_string(),
            ));
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaConfig;
    use crate::index::models::{Chunk, RetrievedChunk};
    use mock::MockGenerator;

    fn retrieved(texts: &[&str]) -> RetrievalResult {
        texts
            .iter()
            .map(|t| RetrievedChunk {
                chunk: Chunk {
                    text: t.to_string(),
                    provenance: "doc.txt".to_string(),
                },
                score: 1.0,
            })
            .collect()
    }

    fn synthesizer(generator: Arc<MockGenerator>) -> Synthesizer {
        Synthesizer::new(
            generator,
            PromptTemplate::from_persona(&PersonaConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_context_joined_in_rank_order() {
        let generator = Arc::new(MockGenerator::echo());
        let synth = synthesizer(generator.clone());

        let answer = synth
            .synthesize("Where did he study?", &retrieved(&["first", "second"]))
            .await
            .unwrap();

        assert_eq!(answer, "first\n\nsecond");
        assert_eq!(generator.calls(), 1);
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Question: Where did he study?"));
    }

    #[tokio::test]
    async fn test_answer_returned_verbatim() {
        let generator = Arc::new(MockGenerator::fixed("  He studied at XYZ.\n"));
        let answer = synthesizer(generator)
            .synthesize("q", &retrieved(&["ctx"]))
            .await
            .unwrap();
        assert_eq!(answer, "  He studied at XYZ.\n");
    }

    #[tokio::test]
    async fn test_empty_output_is_generation_error() {
        let generator = Arc::new(MockGenerator::fixed("   "));
        let err = synthesizer(generator)
            .synthesize("q", &retrieved(&["ctx"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn test_model_failure_not_retried() {
        let generator = Arc::new(MockGenerator::failing("rate limited"));
        let err = synthesizer(generator.clone())
            .synthesize("q", &retrieved(&["ctx"]))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Generation(ref m) if m.contains("rate limited")));
        assert_eq!(generator.calls(), 1);
    }
}
