//! Prompt-to-archive pipeline: a natural-language page description goes to
//! an LLM for HTML/CSS, the page's form fields seed a second call for an API
//! scaffold, and both are zipped into a downloadable archive.

pub mod cli;
pub mod config;
pub mod enhance;
pub mod errors;
pub mod extract;
pub mod frontend;
pub mod log;
pub mod package;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod scaffold;
pub mod server;
pub mod store;
pub mod ux;
pub mod wire;
