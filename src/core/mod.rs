pub mod fetch;
pub mod mock_client;

pub use crate::domain::{HttpClient, Operation, RecordedCall};
pub use crate::utils::error::Result;
pub use mock_client::{MockClient, MockResponse, Outcome};
