//! Model service adapters.

mod gemini;

pub use gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiGateway, GeminiGatewayBuilder};
