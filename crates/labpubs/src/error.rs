pub(crate) type DynError = Box<dyn std::error::Error + Send + Sync>;

/// The Errors that may occur when calling the labpubs functions.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<DynError>,
}

/// Types of errors that make up an [`Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The error is associated with an underlying IO error, either on the network or the
    /// filesystem.
    IO,
    /// An error caused when a response body cannot be deserialized.
    Deserialize,
    /// A record from the bibliographic API is missing a required field or has the wrong shape.
    Schema,
    /// A record carries more than one date range.
    InvalidDateRange,
    /// The same item key was found in both the publications and preprints collections.
    Invariant,
    /// An error when an operation has failed to return a value.
    NoValue,
}

impl Error {
    /// Creates a new [`Error`] based on the [`ErrorKind`] and message to describe the error.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            source: None,
        }
    }

    /// Wraps an existing error as the source of [`Error`].
    pub fn wrap<E>(kind: ErrorKind, source: E) -> Self
    where
        E: Into<DynError>,
    {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
        }
    }

    /// Returns the kind of error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Errors raised while talking to a remote API, as opposed to errors in the records it sent.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self.kind, ErrorKind::IO | ErrorKind::Deserialize)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ErrorKind::IO => f.write_str("IO error")?,
            ErrorKind::Deserialize => f.write_str("Deserialize error")?,
            ErrorKind::Schema => f.write_str("Schema violation")?,
            ErrorKind::InvalidDateRange => f.write_str("Invalid date range")?,
            ErrorKind::Invariant => f.write_str("Invariant violation")?,
            ErrorKind::NoValue => f.write_str("No value error")?,
        };

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(cause) = &self.source {
            write!(f, ": caused by {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_message_and_cause() {
        let err = Error::new(ErrorKind::Schema, "missing title");
        assert_eq!("Schema violation: missing title", err.to_string());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = Error::wrap(ErrorKind::IO, io);
        assert_eq!("IO error: caused by boom", err.to_string());
    }

    #[test]
    fn only_transport_errors_are_fetch_errors() {
        assert!(Error::new(ErrorKind::IO, "").is_fetch());
        assert!(Error::new(ErrorKind::Deserialize, "").is_fetch());
        assert!(!Error::new(ErrorKind::Schema, "").is_fetch());
        assert!(!Error::new(ErrorKind::InvalidDateRange, "").is_fetch());
    }
}
