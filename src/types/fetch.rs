use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("unexpected response shape: missing `{0}`")]
    Shape(&'static str),
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Outcome of a discovery or data call.
///
/// `Empty` means the API answered and there was nothing there (or the
/// requested thing does not exist); `Failed` means the call itself went wrong.
/// Callers that only care about "something or nothing" use [`Fetched::into_inner`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Ready(T),
    Empty,
    Failed(FetchError),
}

impl<T> Fetched<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Fetched::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Fetched::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T: Default> Fetched<T> {
    /// Degrades `Empty` and `Failed` to the empty value.
    pub fn into_inner(self) -> T {
        self.ready().unwrap_or_default()
    }
}

/// Collections and tables that can be "there but empty".
pub trait Emptiness {
    fn has_nothing(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn has_nothing(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for super::ObservationTable {
    fn has_nothing(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Emptiness> From<Result<T, FetchError>> for Fetched<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(v) if v.has_nothing() => Fetched::Empty,
            Ok(v) => Fetched::Ready(v),
            Err(e) => Fetched::Failed(e),
        }
    }
}
