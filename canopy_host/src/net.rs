// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire types handed to the network collaborator.
//!
//! Controllers build [`HttpRequest`] values; the host performs the actual
//! fetch and injects the outcome back as a typed completion. Non-2xx
//! responses are surfaced as [`HttpError::Status`] carrying the HTTP status
//! code, everything below that layer as [`HttpError::Transport`].

use thiserror::Error;

/// HTTP method for a collaborator request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET: pagination fetches and batch status lookups.
    Get,
    /// POST: setting a like.
    Post,
    /// DELETE: clearing a like.
    Delete,
}

impl Method {
    /// The method name as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Credential mode for a collaborator request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Credentials {
    /// Send credentials for same-origin requests only.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
    /// Never send credentials.
    Omit,
}

/// A request the host's network collaborator should perform.
///
/// The default headers match what the theme always sent: a JSON content type
/// and the `XMLHttpRequest` marker the server uses to select the JSON
/// rendition of a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    /// Target URL, absolute or host-relative.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// Credential mode.
    pub credentials: Credentials,
}

impl HttpRequest {
    /// Build a request with the theme's default headers and credentials.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: vec![
                ("Content-Type".to_owned(), "application/json".to_owned()),
                ("X-Requested-With".to_owned(), "XMLHttpRequest".to_owned()),
            ],
            credentials: Credentials::SameOrigin,
        }
    }

    /// Add or replace a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            slot.1 = value.to_owned();
        } else {
            self.headers.push((name.to_owned(), value.to_owned()));
        }
        self
    }
}

/// Failure of a network collaborator request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The server responded with a non-2xx status.
    #[error("http status {0}")]
    Status(u16),
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The response body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_headers_present() {
        let req = HttpRequest::new(Method::Get, "/?page=2&ajax=true");
        assert_eq!(req.method.as_str(), "GET");
        assert_eq!(req.credentials, Credentials::SameOrigin);
        assert!(
            req.headers
                .iter()
                .any(|(n, v)| n == "X-Requested-With" && v == "XMLHttpRequest")
        );
    }

    #[test]
    fn with_header_replaces_case_insensitively() {
        let req = HttpRequest::new(Method::Post, "/api/v1alpha1/posts/p1/like")
            .with_header("content-type", "text/plain")
            .with_header("Accept", "application/json");

        let content_types: Vec<_> = req
            .headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(content_types[0].1, "text/plain");
        assert!(req.headers.iter().any(|(n, _)| n == "Accept"));
    }
}
