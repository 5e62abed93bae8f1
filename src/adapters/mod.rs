// Adapters layer: concrete implementations over external systems.

pub mod http;

pub use http::ReqwestClient;
