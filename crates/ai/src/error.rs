use thiserror::Error;

/// Failure talking to the model. Never retried.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// No provider or no key
    #[error("analysis not configured: {0}")]
    NotConfigured(String),

    /// Key rejected (401/403, or an invalid-key 400)
    #[error("API key rejected: {0}")]
    Auth(String),

    /// Rate limit or quota exhausted (429)
    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Transport failure (DNS, connect, TLS, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The prompt was refused by the provider's safety filter
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// No candidate text came back
    #[error("model returned no text")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("table is {chars} characters, over the {limit} character prompt budget")]
    TableTooLarge { chars: usize, limit: usize },
}

/// Either half of `Dispatcher::analyze` can fail.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
