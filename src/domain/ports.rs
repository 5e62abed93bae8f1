use crate::domain::model::BodyReader;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// The HTTP capability that calling code depends on.
///
/// `ReqwestClient` talks to the network; `MockClient` returns canned
/// results and records every call. A non-2xx status is not an error here.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<Response>;

    async fn execute(&self, request: Request) -> Result<Response>;

    /// POST `body` as-is with the given `Content-Type`.
    async fn post(&self, url: &str, content_type: &str, body: BodyReader) -> Result<Response>;

    /// POST `form` url-encoded.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response>;

    async fn head(&self, url: &str) -> Result<Response>;

    /// Drop pooled connections that are not currently in use.
    fn close_idle_connections(&self);
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn get(&self, url: &str) -> Result<Response> {
        (**self).get(url).await
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        (**self).execute(request).await
    }

    async fn post(&self, url: &str, content_type: &str, body: BodyReader) -> Result<Response> {
        (**self).post(url, content_type, body).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
        (**self).post_form(url, form).await
    }

    async fn head(&self, url: &str) -> Result<Response> {
        (**self).head(url).await
    }

    fn close_idle_connections(&self) {
        (**self).close_idle_connections()
    }
}
