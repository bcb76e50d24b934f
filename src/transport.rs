//! HTTP transport used by the PurpleAir client.
//!
//! The client never talks to the network directly. It hands an
//! [`HttpRequest`] to a [`Transport`], which makes exactly one attempt and
//! reports either the raw response or a classified [`Error`].
//!
//! With the `reqwest` feature, `reqwest::Client` implements [`Transport`].

use std::future::Future;
use std::sync::Arc;

use crate::error::Error;

/// A GET request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Full URL including the query string
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(&'static str, String)>,
}

impl HttpRequest {
    /// Create a GET request for `url` with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Look up a header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as seen by the client: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can issue a single HTTP GET.
///
/// Implementations must not retry. Connection-level failures are reported as
/// [`Error::Transport`]; a response with any status code is returned as `Ok`.
pub trait Transport {
    /// Send `request` and wait for the response.
    fn fetch(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, Error>> + Send;
}

impl<T: Transport + Send + Sync> Transport for Arc<T> {
    fn fetch(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, Error>> + Send {
        (**self).fetch(request)
    }
}

#[cfg(feature = "reqwest")]
impl Transport for reqwest::Client {
    fn fetch(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, Error>> + Send {
        let mut builder = reqwest::Client::get(self, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| Error::Decode(format!("Failed to read response body: {}", e)))?;
            Ok(HttpResponse { status, body })
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// One scripted outcome.
    #[derive(Debug, Clone)]
    pub(crate) enum Reply {
        Respond { status: u16, body: String },
        ConnectionRefused,
    }

    impl Reply {
        pub(crate) fn json(body: serde_json::Value) -> Self {
            Reply::Respond {
                status: 200,
                body: body.to_string(),
            }
        }

        pub(crate) fn status(status: u16, body: &str) -> Self {
            Reply::Respond {
                status,
                body: body.to_string(),
            }
        }
    }

    /// Replays replies in order; the last one repeats forever.
    #[derive(Debug)]
    pub(crate) struct MockTransport {
        replies: Vec<Reply>,
        calls: AtomicUsize,
        last_request: Mutex<Option<HttpRequest>>,
    }

    impl MockTransport {
        pub(crate) fn new(replies: Vec<Reply>) -> Self {
            assert!(!replies.is_empty(), "no replies scripted");
            Self {
                replies,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub(crate) fn replying(reply: Reply) -> Self {
            Self::new(vec![reply])
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_request(&self) -> Option<HttpRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn fetch(
            &self,
            request: HttpRequest,
        ) -> impl Future<Output = Result<HttpResponse, Error>> + Send {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);

            let result = match &self.replies[index.min(self.replies.len() - 1)] {
                Reply::Respond { status, body } => Ok(HttpResponse {
                    status: *status,
                    body: body.clone(),
                }),
                Reply::ConnectionRefused => Err(Error::Transport("connection refused".into())),
            };
            std::future::ready(result)
        }
    }
}
