pub mod relay_client_c;
pub mod relay_client_error;
pub use relay_client_c::RelayClient;
pub use relay_client_error::RelayClientError;
