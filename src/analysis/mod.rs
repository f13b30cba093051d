// src/analysis/mod.rs
//! Analysis Provider seam and the placeholder fallback around it

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::types::AnalysisRequest;

pub mod gemini_client;
pub mod prompts;

pub use gemini_client::GeminiClient;

/// Text-in/text-out generation service
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub text: String,
    /// True when the provider failed and the placeholder was substituted
    pub placeholder: bool,
}

/// Renders prompts and never fails: provider errors become the placeholder.
#[derive(Clone)]
pub struct Analyzer {
    provider: Arc<dyn AnalysisProvider>,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let prompt = prompts::render(request);

        match self.provider.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => AnalysisOutcome {
                text: text.trim().to_string(),
                placeholder: false,
            },
            Ok(_) => {
                warn!("Error analyzing {}: no response generated", request.kind());
                self.fallback(request)
            }
            Err(e) => {
                warn!("Error analyzing {}: {:#}", request.kind(), e);
                self.fallback(request)
            }
        }
    }

    fn fallback(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        AnalysisOutcome {
            text: prompts::placeholder(request.kind()),
            placeholder: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingProvider, ScriptedProvider};
    use crate::types::{AnalysisKind, IcebreakerRequest};

    fn icebreaker() -> AnalysisRequest {
        IcebreakerRequest {
            linkedin_bio: "CTO at Globex".to_string(),
            pitch_deck: "Observability platform".to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_provider_text_is_used_when_available() {
        let provider = Arc::new(ScriptedProvider::new("  **Summary:** warm lead \n"));
        let analyzer = Analyzer::new(provider.clone());

        let outcome = analyzer.analyze(&icebreaker()).await;
        assert_eq!(outcome.text, "**Summary:** warm lead");
        assert!(!outcome.placeholder);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("CTO at Globex"));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_placeholder() {
        let analyzer = Analyzer::new(Arc::new(FailingProvider));

        let outcome = analyzer.analyze(&icebreaker()).await;
        assert!(outcome.placeholder);
        assert_eq!(outcome.text, prompts::placeholder(AnalysisKind::Icebreaker));
    }

    #[tokio::test]
    async fn test_blank_provider_text_falls_back_to_placeholder() {
        let analyzer = Analyzer::new(Arc::new(ScriptedProvider::new("   ")));
        assert!(analyzer.analyze(&icebreaker()).await.placeholder);
    }
}
