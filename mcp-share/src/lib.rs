pub mod emqx;
pub mod error;
pub mod request;

// Re-exports for convenience
pub use emqx::{EmqxClient, EmqxConfig};
pub use error::{PublishError, error_envelope};
pub use request::PublishRequest;
