mod client;
mod config;

pub use client::{domain_of, ClientError, ClientResult, HttpClient};
pub use config::NetworkConfig;
