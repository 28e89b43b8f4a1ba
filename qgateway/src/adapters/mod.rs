//! Gateway adapters over external completion providers.

pub mod openai;

pub use openai::OpenAiCompatGateway;
