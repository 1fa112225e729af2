mod server;

pub use server::{ConfigFile, DEFAULT_REQUEST_TIMEOUT, ServerConfig};
