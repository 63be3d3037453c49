pub mod anthropic;
pub mod base;
pub mod configs;
pub mod factory;
pub mod google;
pub mod groq;
pub mod http;
pub mod openai;
pub mod utils;

#[cfg(test)]
pub mod mock;
