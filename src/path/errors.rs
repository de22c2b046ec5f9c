use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PathError {
    #[error("invalid query '{query}' at position {position}: {message}")]
    Syntax {
        query: String,
        position: usize,
        message: String,
    },

    #[error("invalid regex '{pattern}' in query: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
