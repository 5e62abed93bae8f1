//! In-memory `HttpClient` for unit tests.
//!
//! Each operation keeps its own call log and outcomes. For the n-th call of
//! an operation the outcome is picked in this order: the stub closure, the
//! outcome set for call n, the fallback set with `returns`. With none of
//! those configured the call fails with `HttpError::Unstubbed`.
//!
//! ```no_run
//! use httpmoq::{HttpClient, MockClient, MockResponse, Operation, TransportError};
//!
//! # async fn demo() {
//! let mock = MockClient::new();
//! mock.returns_on_call(Operation::Get, 0, MockResponse::ok().body("ok"));
//! mock.returns_on_call(Operation::Get, 1, TransportError::connection_refused("127.0.0.1:80"));
//!
//! let first = mock.get("http://localhost/").await.unwrap();
//! assert_eq!(first.text().await.unwrap(), "ok");
//! assert!(mock.get("http://localhost/").await.unwrap_err().is_connect());
//! assert_eq!(mock.call_count(Operation::Get), 2);
//! # }
//! ```

use crate::domain::model::{PostArgs, PostFormArgs, RequestArgs};
use crate::domain::{BodyReader, HttpClient, Operation, RecordedCall};
use crate::utils::error::{HttpError, Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::AsyncReadExt;

/// A canned response. Cloned and turned into a fresh `reqwest::Response`
/// every time it is served.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(value.to_string());
        self
    }

    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Response::from(response)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Respond(MockResponse),
    Fail(TransportError),
}

impl Outcome {
    fn resolve(self) -> Result<Response> {
        match self {
            Outcome::Respond(response) => Ok(response.into_response()),
            Outcome::Fail(error) => Err(HttpError::Transport(error)),
        }
    }
}

impl From<MockResponse> for Outcome {
    fn from(response: MockResponse) -> Self {
        Outcome::Respond(response)
    }
}

impl From<TransportError> for Outcome {
    fn from(error: TransportError) -> Self {
        Outcome::Fail(error)
    }
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        Outcome::Respond(MockResponse::new(status))
    }
}

type StubFn = Arc<dyn Fn(usize, &RecordedCall) -> Result<MockResponse> + Send + Sync>;

#[derive(Default)]
struct OperationState {
    calls: Vec<RecordedCall>,
    fallback: Option<Outcome>,
    on_call: HashMap<usize, Outcome>,
    stub: Option<StubFn>,
}

#[derive(Default)]
struct State {
    operations: HashMap<Operation, OperationState>,
    // 所有操作依到達順序的呼叫紀錄
    log: Vec<RecordedCall>,
}

impl State {
    fn push(&mut self, call: RecordedCall) -> usize {
        self.log.push(call.clone());
        let op = self.operations.entry(call.operation()).or_default();
        op.calls.push(call);
        op.calls.len() - 1
    }
}

/// Test double for `HttpClient`.
#[derive(Default)]
pub struct MockClient {
    state: Mutex<State>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fallback outcome for every call of `operation` without a per-call one.
    pub fn returns(&self, operation: Operation, outcome: impl Into<Outcome>) {
        self.lock()
            .operations
            .entry(operation)
            .or_default()
            .fallback = Some(outcome.into());
    }

    /// Outcome for the `call`-th (0-based) call of `operation`.
    pub fn returns_on_call(&self, operation: Operation, call: usize, outcome: impl Into<Outcome>) {
        self.lock()
            .operations
            .entry(operation)
            .or_default()
            .on_call
            .insert(call, outcome.into());
    }

    /// Outcomes for calls 0, 1, 2, ... of `operation`, in order.
    pub fn returns_in_sequence<I, O>(&self, operation: Operation, outcomes: I)
    where
        I: IntoIterator<Item = O>,
        O: Into<Outcome>,
    {
        let mut state = self.lock();
        let op = state.operations.entry(operation).or_default();
        for (call, outcome) in outcomes.into_iter().enumerate() {
            op.on_call.insert(call, outcome.into());
        }
    }

    /// Computes the result of every call of `operation` from its index and
    /// arguments. Takes precedence over configured outcomes.
    pub fn stub<F>(&self, operation: Operation, stub: F)
    where
        F: Fn(usize, &RecordedCall) -> Result<MockResponse> + Send + Sync + 'static,
    {
        self.lock().operations.entry(operation).or_default().stub = Some(Arc::new(stub));
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .operations
            .get(&operation)
            .map_or(0, |op| op.calls.len())
    }

    /// Every recorded call, across all operations, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().log.clone()
    }

    /// Recorded calls of one operation.
    pub fn calls_for(&self, operation: Operation) -> Vec<RecordedCall> {
        self.lock()
            .operations
            .get(&operation)
            .map(|op| op.calls.clone())
            .unwrap_or_default()
    }

    fn args_for_call(&self, operation: Operation, call: usize) -> Option<RecordedCall> {
        self.lock()
            .operations
            .get(&operation)
            .and_then(|op| op.calls.get(call).cloned())
    }

    pub fn get_args_for_call(&self, call: usize) -> Option<String> {
        match self.args_for_call(Operation::Get, call)? {
            RecordedCall::Get(url) => Some(url),
            _ => None,
        }
    }

    pub fn execute_args_for_call(&self, call: usize) -> Option<RequestArgs> {
        match self.args_for_call(Operation::Execute, call)? {
            RecordedCall::Execute(args) => Some(args),
            _ => None,
        }
    }

    pub fn post_args_for_call(&self, call: usize) -> Option<PostArgs> {
        match self.args_for_call(Operation::Post, call)? {
            RecordedCall::Post(args) => Some(args),
            _ => None,
        }
    }

    pub fn post_form_args_for_call(&self, call: usize) -> Option<PostFormArgs> {
        match self.args_for_call(Operation::PostForm, call)? {
            RecordedCall::PostForm(args) => Some(args),
            _ => None,
        }
    }

    pub fn head_args_for_call(&self, call: usize) -> Option<String> {
        match self.args_for_call(Operation::Head, call)? {
            RecordedCall::Head(url) => Some(url),
            _ => None,
        }
    }

    pub fn close_idle_connections_call_count(&self) -> usize {
        self.call_count(Operation::CloseIdleConnections)
    }

    /// Clears every call log and every configured outcome.
    pub fn reset(&self) {
        *self.lock() = State::default();
    }

    /// Records `call` and picks its result. Indices are assigned under one
    /// lock, so concurrent callers get consecutive call indices. The stub
    /// runs after the lock is released and may call back into the mock.
    fn record(&self, call: RecordedCall) -> (usize, Option<Result<Response>>) {
        let (index, call, stub, outcome) = {
            let mut state = self.lock();
            let operation = call.operation();
            let index = state.push(call.clone());
            let op = state.operations.entry(operation).or_default();
            let outcome = op.on_call.get(&index).or(op.fallback.as_ref()).cloned();
            (index, call, op.stub.clone(), outcome)
        };

        let result = match stub {
            Some(stub) => Some(stub(index, &call).map(MockResponse::into_response)),
            None => outcome.map(Outcome::resolve),
        };

        (index, result)
    }

    fn respond(&self, call: RecordedCall) -> Result<Response> {
        let operation = call.operation();
        match self.record(call) {
            (_, Some(result)) => result,
            (index, None) => {
                tracing::warn!("MockClient: no outcome for {} call #{}", operation, index);
                Err(HttpError::Unstubbed {
                    operation,
                    call: index,
                })
            }
        }
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn get(&self, url: &str) -> Result<Response> {
        self.respond(RecordedCall::Get(url.to_string()))
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        self.respond(RecordedCall::Execute(RequestArgs::from_request(&request)))
    }

    async fn post(&self, url: &str, content_type: &str, mut body: BodyReader) -> Result<Response> {
        let mut buf = Vec::new();
        let read = body.read_to_end(&mut buf).await;

        let call = RecordedCall::Post(PostArgs {
            url: url.to_string(),
            content_type: content_type.to_string(),
            body: Bytes::from(buf),
        });

        match read {
            Ok(_) => self.respond(call),
            Err(e) => {
                // 讀取失敗仍記錄這次呼叫，不套用設定的回傳值
                self.lock().push(call);
                Err(HttpError::BodyStream(e))
            }
        }
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
        self.respond(RecordedCall::PostForm(PostFormArgs {
            url: url.to_string(),
            form: form.to_vec(),
        }))
    }

    async fn head(&self, url: &str) -> Result<Response> {
        self.respond(RecordedCall::Head(url.to_string()))
    }

    fn close_idle_connections(&self) {
        self.lock().push(RecordedCall::CloseIdleConnections);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::TransportErrorKind;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
            } else {
                self.sent = true;
                buf.put_slice(b"par");
                Poll::Ready(Ok(()))
            }
        }
    }

    #[tokio::test]
    async fn test_sequential_outcomes_for_get() {
        let mock = MockClient::new();
        mock.returns_in_sequence(
            Operation::Get,
            vec![
                Outcome::from(MockResponse::ok().body("ok")),
                Outcome::from(TransportError::connection_refused("127.0.0.1:8080")),
            ],
        );

        let first = mock.get("http://localhost:8080/health").await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.text().await.unwrap(), "ok");

        let second = mock.get("http://localhost:8080/health").await.unwrap_err();
        match second {
            HttpError::Transport(e) => assert_eq!(e.kind, TransportErrorKind::ConnectionRefused),
            other => panic!("unexpected error: {:?}", other),
        }

        let third = mock.get("http://localhost:8080/health").await.unwrap_err();
        assert!(matches!(
            third,
            HttpError::Unstubbed {
                operation: Operation::Get,
                call: 2
            }
        ));
        assert_eq!(mock.call_count(Operation::Get), 3);
    }

    #[tokio::test]
    async fn test_per_call_outcome_overrides_fallback() {
        let mock = MockClient::new();
        mock.returns(Operation::Head, StatusCode::NO_CONTENT);
        mock.returns_on_call(Operation::Head, 1, StatusCode::NOT_FOUND);

        let statuses = [
            mock.head("https://a.test/").await.unwrap().status(),
            mock.head("https://b.test/").await.unwrap().status(),
            mock.head("https://c.test/").await.unwrap().status(),
        ];
        assert_eq!(
            statuses,
            [StatusCode::NO_CONTENT, StatusCode::NOT_FOUND, StatusCode::NO_CONTENT]
        );
        assert_eq!(mock.head_args_for_call(1).as_deref(), Some("https://b.test/"));
        assert_eq!(mock.head_args_for_call(3), None);
    }

    #[tokio::test]
    async fn test_stub_takes_precedence_and_sees_arguments() {
        let mock = MockClient::new();
        mock.returns(Operation::Get, StatusCode::INTERNAL_SERVER_ERROR);
        mock.stub(Operation::Get, |index, call| {
            let url = call.url().unwrap_or_default();
            Ok(MockResponse::ok().body(format!("{}:{}", index, url)))
        });

        let body = mock.get("https://x.test/a").await.unwrap().text().await.unwrap();
        assert_eq!(body, "0:https://x.test/a");
        let body = mock.get("https://x.test/b").await.unwrap().text().await.unwrap();
        assert_eq!(body, "1:https://x.test/b");
    }

    #[test]
    fn test_stub_can_read_mock_state() {
        let mock = Arc::new(MockClient::new());
        let weak = Arc::downgrade(&mock);
        mock.stub(Operation::Get, move |_, _| {
            let count = weak
                .upgrade()
                .map_or(0, |m| m.call_count(Operation::Get));
            Ok(MockResponse::ok().body(count.to_string()))
        });

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = mock.clone();
        std::thread::spawn(move || {
            let body = tokio_test::block_on(async {
                worker.get("http://x/").await.unwrap().text().await.unwrap()
            });
            let _ = tx.send(body);
        });

        let body = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("stub reading call_count did not return");
        assert_eq!(body, "1");
        assert_eq!(mock.get_args_for_call(0).as_deref(), Some("http://x/"));
    }

    #[tokio::test]
    async fn test_post_records_body_and_content_type() {
        let mock = MockClient::new();
        mock.returns(Operation::Post, MockResponse::new(StatusCode::CREATED));

        let body: BodyReader = Box::new(io::Cursor::new(b"{\"id\":1}".to_vec()));
        let response = mock
            .post("https://api.test/items", "application/json", body)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let args = mock.post_args_for_call(0).unwrap();
        assert_eq!(args.url, "https://api.test/items");
        assert_eq!(args.content_type, "application/json");
        assert_eq!(args.body, Bytes::from_static(b"{\"id\":1}"));
    }

    #[tokio::test]
    async fn test_post_body_read_error() {
        let mock = MockClient::new();
        mock.returns(Operation::Post, MockResponse::ok());

        let body: BodyReader = Box::new(FailingReader { sent: false });
        let err = mock
            .post("https://api.test/upload", "text/plain", body)
            .await
            .unwrap_err();

        assert!(matches!(err, HttpError::BodyStream(_)));
        assert_eq!(mock.call_count(Operation::Post), 1);
        assert_eq!(
            mock.post_args_for_call(0).unwrap().body,
            Bytes::from_static(b"par")
        );
    }

    #[tokio::test]
    async fn test_execute_and_form_arguments() {
        let mock = MockClient::new();
        mock.returns(Operation::Execute, MockResponse::ok());
        mock.returns(Operation::PostForm, MockResponse::ok());

        let url = url::Url::parse("https://api.test/items/7").unwrap();
        let mut request = Request::new(reqwest::Method::DELETE, url.clone());
        request
            .headers_mut()
            .insert("x-trace", HeaderValue::from_static("abc"));
        mock.execute(request).await.unwrap();

        let form = vec![
            ("tag".to_string(), "a".to_string()),
            ("tag".to_string(), "b".to_string()),
        ];
        mock.post_form("https://api.test/tags", &form).await.unwrap();

        let args = mock.execute_args_for_call(0).unwrap();
        assert_eq!(args.method, reqwest::Method::DELETE);
        assert_eq!(args.url, url);
        assert_eq!(args.headers.get("x-trace").unwrap(), "abc");
        assert_eq!(args.body, None);

        let form_args = mock.post_form_args_for_call(0).unwrap();
        assert_eq!(form_args.form, form);
    }

    #[tokio::test]
    async fn test_json_response_and_headers() {
        let mock = MockClient::new();
        mock.returns(
            Operation::Get,
            MockResponse::ok()
                .header(
                    HeaderName::from_static("x-request-id"),
                    HeaderValue::from_static("42"),
                )
                .json(&serde_json::json!({"status": "up"})),
        );

        let response = mock.get("https://api.test/status").await.unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "42");
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let value: serde_json::Value = response.json().await.unwrap();
        assert_eq!(value["status"], "up");
    }

    #[tokio::test]
    async fn test_call_log_order_and_reset() {
        let mock = MockClient::new();
        mock.returns(Operation::Get, MockResponse::ok());
        mock.returns(Operation::Head, MockResponse::ok());

        mock.get("https://a.test/").await.unwrap();
        mock.close_idle_connections();
        mock.head("https://b.test/").await.unwrap();

        let ops: Vec<Operation> = mock.calls().iter().map(RecordedCall::operation).collect();
        assert_eq!(
            ops,
            vec![
                Operation::Get,
                Operation::CloseIdleConnections,
                Operation::Head
            ]
        );
        assert_eq!(mock.close_idle_connections_call_count(), 1);
        assert_eq!(mock.calls_for(Operation::Head).len(), 1);

        mock.reset();
        assert!(mock.calls().is_empty());
        assert_eq!(mock.call_count(Operation::Get), 0);
        assert!(mock.get("https://a.test/").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_distinct_indices() {
        let mock = std::sync::Arc::new(MockClient::new());
        mock.stub(Operation::Get, |index, _| {
            Ok(MockResponse::ok().body(index.to_string()))
        });

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mock = mock.clone();
            handles.push(tokio::spawn(async move {
                mock.get("https://a.test/").await.unwrap().text().await.unwrap()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap().parse::<usize>().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert_eq!(mock.call_count(Operation::Get), 8);
    }
}
