//! Error types for the episode pipeline.

use thiserror::Error;

/// Errors raised by the core pipeline and surfaced in the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No article survived scoring, deduplication and filtering.
    #[error("no articles left to build an episode from ({reason})")]
    InsufficientArticles { reason: String },

    /// Overall script quality fell below the configured minimum.
    #[error("script quality {score:.2} is below the minimum of {minimum:.2}")]
    ScriptQualityBelowThreshold { score: f64, minimum: f64 },

    /// A collaborator (collector, generator, synthesizer, publisher) failed.
    #[error("{service} failed: {source:#}")]
    ExternalService {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An article was rejected on insert.
    #[error("invalid article: {0}")]
    InvalidArticle(String),

    /// Relevance scores were already assigned for this store.
    #[error("articles have already been scored")]
    AlreadyScored,

    /// The podcast configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn external(service: &'static str, source: anyhow::Error) -> Self {
        Self::ExternalService { service, source }
    }

    /// Whether the run can continue after this error was reported.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ScriptQualityBelowThreshold { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_service_error_names_the_service() {
        let err = PipelineError::external("audio synthesizer", anyhow::anyhow!("HTTP 500"));
        let msg = err.to_string();
        assert!(msg.contains("audio synthesizer"));
        assert!(msg.contains("HTTP 500"));
        assert!(!err.is_warning());
    }

    #[test]
    fn quality_breach_is_only_a_warning() {
        let err = PipelineError::ScriptQualityBelowThreshold {
            score: 0.42,
            minimum: 0.6,
        };
        assert!(err.is_warning());
        assert!(err.to_string().contains("0.42"));
    }
}
