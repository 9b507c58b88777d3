pub mod client;
pub mod models;
pub mod resolver;

pub use client::YtDlpClient;
pub use models::ResolverConfig;
pub use resolver::MediaResolver;
