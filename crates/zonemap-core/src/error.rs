pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Feed is empty")]
    EmptyFeed,

    #[error("Feed parse error ({format}): {message}")]
    FeedParse {
        format: &'static str,
        message: String,
    },

    #[error("Feed has no identifier column (headers: {headers})")]
    MissingIdColumn { headers: String },

    #[error("Invalid config at `{path}`: {message}")]
    Config { path: String, message: String },

    #[error("Feed source error: {message}")]
    Source { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON5 config: {0}")]
    Json5(#[from] json5::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
