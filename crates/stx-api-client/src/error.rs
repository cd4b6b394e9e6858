use reqwest::StatusCode;

/// The errors that can occur when calling the ledger API.
///
/// A broadcast the node refused is not an error; see
/// [`BroadcastResponse::Rejected`](crate::BroadcastResponse::Rejected).
#[derive(Debug)]
pub struct Error {
    inner: ErrorKind,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            ErrorKind::InvalidUrl {
                ..
            } => f.write_str("ledger API url is invalid"),
            ErrorKind::Transport {
                endpoint, ..
            } => write!(f, "request to `{endpoint}` did not complete"),
            ErrorKind::Status {
                endpoint,
                status,
                body,
            } => write!(f, "`{endpoint}` responded with status `{status}`: {body}"),
            ErrorKind::Deserialization {
                endpoint, ..
            } => write!(f, "failed deserializing response of `{endpoint}`"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.inner {
            ErrorKind::InvalidUrl {
                source,
            } => Some(source.as_ref()),
            ErrorKind::Transport {
                source, ..
            } => Some(source),
            ErrorKind::Status {
                ..
            } => None,
            ErrorKind::Deserialization {
                source, ..
            } => Some(source.as_ref()),
        }
    }
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.inner
    }

    /// Returns true if the request never produced a response, e.g. because the connection
    /// was refused or timed out.
    ///
    /// Such requests may be retried: the node either never saw them or will treat a repeat
    /// of the same bytes as a duplicate.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.inner, ErrorKind::Transport { .. })
    }

    /// Returns the HTTP status if the API responded with a non-success status.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match &self.inner {
            ErrorKind::Status {
                status, ..
            } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn invalid_url(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            inner: ErrorKind::InvalidUrl {
                source: Box::new(source),
            },
        }
    }

    pub(crate) fn transport(endpoint: &'static str, source: reqwest::Error) -> Self {
        Self {
            inner: ErrorKind::Transport {
                endpoint,
                source,
            },
        }
    }

    pub(crate) fn bad_status(endpoint: &'static str, status: StatusCode, body: String) -> Self {
        Self {
            inner: ErrorKind::Status {
                endpoint,
                status,
                body,
            },
        }
    }

    pub(crate) fn deserialization(
        endpoint: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            inner: ErrorKind::Deserialization {
                endpoint,
                source: source.into(),
            },
        }
    }
}

/// The reasons a call to the ledger API can fail.
///
/// None of these are constructable outside this crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    InvalidUrl {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    Deserialization {
        endpoint: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
