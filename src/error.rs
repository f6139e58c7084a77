use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge base {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed knowledge base: {0}")]
    Parse(#[from] serde_json::Error),
}
