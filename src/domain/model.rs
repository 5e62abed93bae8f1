use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::fmt;
use tokio::io::AsyncRead;
use url::Url;

/// 表單欄位，保留順序；同一個 key 可以重複出現
pub type FormValues = Vec<(String, String)>;

/// POST 的串流 body
pub type BodyReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Execute,
    Post,
    PostForm,
    Head,
    CloseIdleConnections,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Execute => "execute",
            Operation::Post => "post",
            Operation::PostForm => "post_form",
            Operation::Head => "head",
            Operation::CloseIdleConnections => "close_idle_connections",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments captured from a single `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestArgs {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` when the request had no body or a streaming one.
    pub body: Option<Bytes>,
}

impl RequestArgs {
    pub fn from_request(request: &reqwest::Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(Bytes::copy_from_slice),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostArgs {
    pub url: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostFormArgs {
    pub url: String,
    pub form: FormValues,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get(String),
    Execute(RequestArgs),
    Post(PostArgs),
    PostForm(PostFormArgs),
    Head(String),
    CloseIdleConnections,
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            RecordedCall::Get(_) => Operation::Get,
            RecordedCall::Execute(_) => Operation::Execute,
            RecordedCall::Post(_) => Operation::Post,
            RecordedCall::PostForm(_) => Operation::PostForm,
            RecordedCall::Head(_) => Operation::Head,
            RecordedCall::CloseIdleConnections => Operation::CloseIdleConnections,
        }
    }

    /// The target URL, if the call had one.
    pub fn url(&self) -> Option<&str> {
        match self {
            RecordedCall::Get(url) | RecordedCall::Head(url) => Some(url),
            RecordedCall::Execute(args) => Some(args.url.as_str()),
            RecordedCall::Post(args) => Some(&args.url),
            RecordedCall::PostForm(args) => Some(&args.url),
            RecordedCall::CloseIdleConnections => None,
        }
    }
}
