use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Actionable follow-up shown under the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Usage(_) => Some(
                "usage: deploy-kit dns <subdomain> <domain> <target> [--proxied] [--force]\n       \
                 deploy-kit image <prompt> <output>",
            ),
            Error::Config(_) => Some(
                "create a Cloudflare API token with Zone:DNS:Edit at \
                 https://dash.cloudflare.com/profile/api-tokens, \
                 or a Gemini key at https://aistudio.google.com/apikey",
            ),
            Error::NotFound(_) => Some("make sure the domain is added to the account the token belongs to"),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Usage(_) => 2,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Parse(err.to_string())
    }
}
