use thiserror::Error;

/// Failure while rendering one tagged element.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Malformed parameter attribute: {0}")]
    MalformedParameters(#[from] serde_json::Error),

    #[error("Parameter attribute must be a JSON array")]
    ParametersNotAList,

    #[error("Unsupported parameter at index {index}: {value}")]
    UnsupportedParameter { index: usize, value: String },
}
