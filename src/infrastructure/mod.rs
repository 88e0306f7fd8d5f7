pub mod config;
pub mod console_view;
pub mod error;
pub mod task_client;
