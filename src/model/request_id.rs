//! Request-ID is a UUID used to correlate the logs of one HTTP request

use http::HeaderMap;
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::*;
use uuid::Uuid;

/// Request-ID for correlating logs together
#[derive(Clone, Debug, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestId(Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(c: Uuid) -> Self {
        RequestId(c)
    }
}

impl From<RequestId> for Uuid {
    fn from(c: RequestId) -> Self {
        c.0
    }
}

impl<'a> TryFrom<&'a str> for RequestId {
    type Error = InvalidRequestId;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        Uuid::parse_str(input)
            .map(RequestId)
            .map_err(|_| InvalidRequestId::InvalidString(input.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRequestId {
    #[error("request-id not found")]
    NotFound,
    #[error("Invalid request-id string {0}")]
    InvalidString(String),
}

impl RequestId {
    pub const HEADER_NAME: &'static str = "x-request-id";

    pub fn new() -> Self {
        RequestId(Uuid::new_v4())
    }

    /// Extract request-id from a set of HTTP headers
    ///
    /// # Examples
    ///
    /// ```
    /// # use http::{HeaderMap, HeaderValue};
    /// # use todolist::model::RequestId;
    /// let rid = RequestId::new();
    /// let mut headers = HeaderMap::new();
    /// headers.insert(
    ///     RequestId::HEADER_NAME,
    ///     HeaderValue::from_str(&rid.to_string()).unwrap(),
    /// );
    ///
    /// assert_eq!(RequestId::from_header_map(&headers).unwrap(), rid);
    /// ```
    pub fn from_header_map(h: &HeaderMap) -> Result<Self, InvalidRequestId> {
        h.get(Self::HEADER_NAME)
            .ok_or(InvalidRequestId::NotFound)
            .and_then(|x| {
                x.to_str()
                    .map_err(|err| InvalidRequestId::InvalidString(err.to_string()))
            })
            .and_then(RequestId::try_from)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}
