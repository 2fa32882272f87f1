pub mod analyzer;
pub mod app_state;
pub mod backend;
pub mod config;
pub mod formatter;
pub mod models;
pub mod process;
pub mod settings_state;
