pub mod books;
pub mod cache;
pub mod config;
pub mod counselor;
pub mod devotional;
pub mod error;
pub mod gemini;
pub mod home;
pub mod models;
pub mod narration;
pub mod reader;
pub mod scripture;
pub mod search;
pub mod server;
pub mod translation;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use server::{run_server, AppState};
