//! The fetch event a worker receives for every intercepted request.

use std::future::Future;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::{BoxError, ExtendLifetime, Request, Response};

#[derive(Debug)]
struct FetchEventInner {
    request: Request,
    client_id: Option<SmolStr>,
    preload_response: Option<Response>,
    lifetime: ExtendLifetime<BoxError>,
}

/// An intercepted request together with its extended-lifetime set.
///
/// Cheap to clone; clones share the same pending work.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    inner: Arc<FetchEventInner>,
}

impl FetchEvent {
    /// Creates an event for `request`.
    pub fn new(request: Request) -> Self {
        FetchEvent::builder(request).build()
    }

    /// Starts building an event for `request`.
    pub fn builder(request: Request) -> FetchEventBuilder {
        FetchEventBuilder {
            request,
            client_id: None,
            preload_response: None,
        }
    }

    /// The intercepted request.
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Identifier of the client (page) that issued the request.
    pub fn client_id(&self) -> Option<&str> {
        self.inner.client_id.as_deref()
    }

    /// Navigation preload response, if the platform started one.
    pub fn preload_response(&self) -> Option<Response> {
        self.inner.preload_response.clone()
    }

    /// Keeps the event alive until `task` completes.
    pub fn wait_until<F, E>(&self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.inner
            .lifetime
            .wait_until("fetch_event", async move { task.await.map_err(Into::into) });
    }

    /// Number of lifetime extensions not yet settled.
    pub fn pending(&self) -> usize {
        self.inner.lifetime.len()
    }

    /// Waits for every lifetime extension, returning the first failure.
    pub async fn settled(&self) -> Result<(), BoxError> {
        self.inner.lifetime.join().await
    }
}

/// Builder for [`FetchEvent`].
#[derive(Debug)]
pub struct FetchEventBuilder {
    request: Request,
    client_id: Option<SmolStr>,
    preload_response: Option<Response>,
}

impl FetchEventBuilder {
    /// Sets the client identifier.
    pub fn client_id(mut self, client_id: impl Into<SmolStr>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the navigation preload response.
    pub fn preload_response(mut self, response: Response) -> Self {
        self.preload_response = Some(response);
        self
    }

    /// Builds the event.
    pub fn build(self) -> FetchEvent {
        FetchEvent {
            inner: Arc::new(FetchEventInner {
                request: self.request,
                client_id: self.client_id,
                preload_response: self.preload_response,
                lifetime: ExtendLifetime::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[tokio::test]
    async fn settled_reports_first_failure() {
        let event = FetchEvent::new(Request::get("https://example.com/").unwrap());
        event.wait_until(async { Ok::<_, io::Error>(()) });
        event.wait_until(async { Err(io::Error::other("write failed")) });

        let error = event.settled().await.unwrap_err();
        assert_eq!(error.to_string(), "write failed");
        assert_eq!(event.pending(), 0);
    }

    #[tokio::test]
    async fn preload_response_is_exposed() {
        let event = FetchEvent::builder(Request::navigate("https://example.com/").unwrap())
            .client_id("client-1")
            .preload_response(Response::ok("preloaded"))
            .build();

        assert_eq!(event.client_id(), Some("client-1"));
        assert_eq!(event.preload_response().unwrap().text(), "preloaded");
    }
}
