//! Language model contracts.
//!
//! The core never talks to a model directly: it builds a [`ModelRequest`],
//! hands it to a [`LanguageModel`] under a bounded timeout, and validates
//! the text that comes back.

mod error;
mod http;
pub mod json;
mod model;

pub use error::AiError;
pub use http::HttpLanguageModel;
pub use json::{extract_json_block, parse_json_response};
pub use model::{InlineDocument, LanguageModel, ModelRequest, generate_with_timeout};
