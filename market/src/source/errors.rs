use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from price source: {0}")]
    InvalidResponse(String),

    #[error("numeric parse error: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),

    #[error("price source returned a zero price for {0}")]
    ZeroPrice(String),
}
