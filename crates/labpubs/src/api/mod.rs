//! Remote services and the HTTP client they are reached through.

use serde::de::DeserializeOwned;

pub mod idconv;
pub mod zotero;

/// The HTTP seam used by every fetcher.
pub trait Client {
    /// Get the body of `url` as text.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::IO`] when the request cannot be completed or the server answers with an error
    /// status, [`ErrorKind::Deserialize`] when the body is not text.
    fn get_text(&self, url: &str) -> Result<String, Error>;

    /// Get the body of `url` deserialized from JSON.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::IO`] when the request cannot be completed or the server answers with an error
    /// status, [`ErrorKind::Deserialize`] when the body does not match `T`.
    fn get_json<T>(&self, url: &str) -> Result<T, Error>
    where
        T: DeserializeOwned;
}

impl Client for reqwest::blocking::Client {
    fn get_text(&self, url: &str) -> Result<String, Error> {
        self.get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::wrap(ErrorKind::IO, e))?
            .text()
            .map_err(|e| Error::wrap(ErrorKind::Deserialize, e))
    }

    fn get_json<T>(&self, url: &str) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        self.get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::wrap(ErrorKind::IO, e))
            .and_then(|r| r.json().map_err(|e| Error::wrap(ErrorKind::Deserialize, e)))
    }
}

#[cfg(test)]
pub(crate) use test::MockClient;

use crate::{Error, ErrorKind};
