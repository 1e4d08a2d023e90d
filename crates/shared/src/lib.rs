pub mod config;
mod config_env;
pub mod dataset;
pub mod llm;
pub mod models;
pub mod session;
