use thiserror::Error;

/// Errors surfaced by the code generation pipeline.
///
/// Every variant reaches the CLI layer unchanged: the orchestrator performs
/// no recovery and never returns a partial result.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Prompt was empty or whitespace-only. Rejected before any provider call.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Language is outside the configured supported set. Rejected before any
    /// provider call.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A per-request option carried a value that could not be parsed.
    #[error("invalid value for option {name}: {value}")]
    InvalidOption { name: String, value: String },

    /// No template file matched `{language}/{name}` in the catalog.
    #[error("template not found: {language}/{name}")]
    TemplateNotFound { language: String, name: String },

    /// Malformed template block structure (unclosed or stray tag).
    #[error("template syntax error: {0}")]
    TemplateSyntax(String),

    /// The provider call failed. No retry is attempted.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from the hosted LLM provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {provider} failed")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    #[error("failed to parse {provider} response")]
    Parse {
        provider: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{provider} returned an empty response")]
    Empty { provider: String },
}
