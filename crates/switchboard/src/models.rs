//! These models represent the objects passed through the adapter pipeline
//!
//! There are several different related formats we need to interact with:
//! - loosely-typed caller messages, accepted at the validator boundary
//! - openai-compatible messages/tools, sent to OpenAI and Groq
//! - anthropic messages/tools, sent to the Messages API
//! - gemini contents/function declarations, sent to generateContent
//!
//! These all overlap to varying degrees. We always immediately convert those data models
//! into the internal structs using to/from helpers. Because of the need for compatibility,
//! the internal models are not an exact match to any of these formats.
pub mod content;
pub mod message;
pub mod tool;
pub mod validate;
