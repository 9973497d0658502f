mod counting;
mod http;

pub use counting::CountingStream;
pub use http::HttpFileStore;
