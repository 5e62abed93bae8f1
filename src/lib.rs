pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::ReqwestClient;
pub use config::{ClientConfig, TomlConfig};
pub use crate::core::{fetch, MockClient, MockResponse, Outcome};
pub use domain::{BodyReader, FormValues, HttpClient, Operation, RecordedCall};
pub use utils::error::{HttpError, Result, TransportError, TransportErrorKind};
