#![forbid(unsafe_code)]

pub mod gateway;
pub mod http;

pub use gateway::{
    AuthGateway, Backend, CatalogGateway, ExecutionGateway, InMemoryBackend, ProgressGateway,
    RemoteError,
};
pub use http::{HttpBackend, HttpConfig};
