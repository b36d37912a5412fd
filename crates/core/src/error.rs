/// Domain errors raised before anything touches the network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Input data does not match the expected shape (CSV schema, rows).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A job or poller setting is outside its allowed range.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
