use crate::domain::model::Operation;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Body stream error: {0}")]
    BodyStream(std::io::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("No outcome configured for {operation} call #{call}")]
    Unstubbed { operation: Operation, call: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 連線層錯誤：拒絕連線、逾時、DNS
    Transport,
    /// 請求已送出，但 reqwest 回報其他錯誤或狀態碼不符預期
    Request,
    Configuration,
    /// 呼叫端用法錯誤，例如無效 URL 或 mock 未設定回傳值
    Usage,
}

impl HttpError {
    pub fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        HttpError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            HttpError::Transport(e) => e.kind == TransportErrorKind::Timeout,
            HttpError::Request(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_connect(&self) -> bool {
        match self {
            HttpError::Transport(e) => matches!(
                e.kind,
                TransportErrorKind::ConnectionRefused
                    | TransportErrorKind::ConnectionReset
                    | TransportErrorKind::Dns
            ),
            HttpError::Request(e) => e.is_connect(),
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HttpError::Transport(_) | HttpError::BodyStream(_) | HttpError::IoError(_) => {
                ErrorCategory::Transport
            }
            HttpError::Request(e)
                if e.is_connect() || e.is_timeout() || e.is_body() || caused_by_io(e) =>
            {
                ErrorCategory::Transport
            }
            HttpError::Request(e) if e.is_builder() => ErrorCategory::Usage,
            HttpError::Request(_) | HttpError::Status { .. } => ErrorCategory::Request,
            HttpError::InvalidUrl { .. } | HttpError::Unstubbed { .. } => ErrorCategory::Usage,
            HttpError::ConfigError { .. }
            | HttpError::ConfigValidationError { .. }
            | HttpError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Transport if self.is_timeout() => {
                "The server did not respond in time".to_string()
            }
            ErrorCategory::Transport if self.is_connect() => {
                "Could not connect to the server".to_string()
            }
            ErrorCategory::Transport => format!("Network failure: {}", self),
            ErrorCategory::Request => format!("Request failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Usage => format!("Invalid request: {}", self),
        }
    }
}

// 串流 body 讀取失敗時，io::Error 會藏在 reqwest / hyper 的錯誤鏈裡
fn caused_by_io(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        if let Some(inner) = cause.downcast_ref::<reqwest::Error>() {
            if inner.is_body() {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    ConnectionReset,
    Timeout,
    Dns,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Dns => "dns lookup failed",
            TransportErrorKind::Other => "transport failure",
        };
        f.write_str(name)
    }
}

/// A transport failure that can be built and cloned without a live socket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection_refused(addr: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionRefused, addr)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn dns(host: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Dns, host)
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
