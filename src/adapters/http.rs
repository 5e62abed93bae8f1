use crate::config::ClientConfig;
use crate::domain::{BodyReader, HttpClient};
use crate::utils::error::{HttpError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, Request, Response};
use std::sync::{PoisonError, RwLock};
use tokio_util::io::ReaderStream;

/// Production `HttpClient` backed by `reqwest`.
pub struct ReqwestClient {
    config: ClientConfig,
    inner: RwLock<Client>,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::from_config(ClientConfig::default())
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            config,
            inner: RwLock::new(client),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // reqwest::Client is an Arc handle, so the clone shares the live pool
    fn current(&self) -> Client {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn send(&self, method: Method, url: &str) -> Result<Response> {
        let url = validation::parse_http_url(url)?;
        tracing::debug!("{} {}", method, url);
        let response = self.current().request(method, url).send().await?;
        log_response(&response);
        Ok(response)
    }
}

fn build_client(config: &ClientConfig) -> Result<Client> {
    let mut builder = Client::builder();

    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = config.connect_timeout() {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(timeout) = config.pool_idle_timeout() {
        builder = builder.pool_idle_timeout(timeout);
    }
    if let Some(max) = config.pool_max_idle_per_host {
        builder = builder.pool_max_idle_per_host(max);
    }
    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent);
    }
    if let Some(headers) = &config.headers {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let (name, value) = validation::validate_header("client.headers", name, value)?;
            default_headers.insert(name, value);
        }
        builder = builder.default_headers(default_headers);
    }

    builder.build().map_err(|e| HttpError::ConfigError {
        message: format!("failed to build HTTP client: {}", e),
    })
}

fn log_response(response: &Response) {
    tracing::debug!("{} responded {}", response.url(), response.status());
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Response> {
        self.send(Method::GET, url).await
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        match request.url().scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(HttpError::invalid_url(
                    request.url().as_str(),
                    format!("Unsupported URL scheme: {}", scheme),
                ))
            }
        }

        tracing::debug!("{} {}", request.method(), request.url());
        let response = self.current().execute(request).await?;
        log_response(&response);
        Ok(response)
    }

    async fn post(&self, url: &str, content_type: &str, body: BodyReader) -> Result<Response> {
        let url = validation::parse_http_url(url)?;
        tracing::debug!("POST {} ({})", url, content_type);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(body));
        let response = self
            .current()
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        log_response(&response);
        Ok(response)
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
        let url = validation::parse_http_url(url)?;
        tracing::debug!("POST {} (form, {} fields)", url, form.len());

        let response = self.current().post(url).form(form).send().await?;
        log_response(&response);
        Ok(response)
    }

    async fn head(&self, url: &str) -> Result<Response> {
        self.send(Method::HEAD, url).await
    }

    fn close_idle_connections(&self) {
        // reqwest 沒有直接關閉閒置連線的 API，改為換掉整個 client，
        // 舊的連線池在進行中的請求結束後釋放
        match build_client(&self.config) {
            Ok(fresh) => {
                let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
                *inner = fresh;
                tracing::debug!("Idle connections released");
            }
            Err(e) => {
                tracing::warn!("Keeping existing connection pool: {}", e);
            }
        }
    }
}
