pub mod anthropic;
pub mod backboard;
pub mod base;
pub mod configs;
pub mod factory;
pub mod openai;
pub mod sse;
pub mod utils;
