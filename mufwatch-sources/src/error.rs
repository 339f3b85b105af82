//! Mapping from transport errors to [`FetchError`].

use mufwatch_core::FetchError;

pub(crate) fn from_reqwest(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else if err.is_decode() {
        FetchError::Parse(err.to_string())
    } else {
        FetchError::Http(err.to_string())
    }
}
