pub mod model;
pub mod ports;

pub use model::{
    BodyReader, FormValues, Operation, PostArgs, PostFormArgs, RecordedCall, RequestArgs,
};
pub use ports::HttpClient;
