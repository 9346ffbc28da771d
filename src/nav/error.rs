use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Failed to fetch page: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse page '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Content container '#{0}' not found")]
    MissingContainer(String),
}
