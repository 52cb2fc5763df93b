//! Model gateway: intents and the service trait.

pub mod errors;
pub mod types;

pub use errors::GatewayError;
pub use types::{FunctionCallIntent, Intent, ModelGateway};
