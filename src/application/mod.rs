pub mod bootstrap;
pub mod commands;
pub mod engine;
pub mod task_store;
pub mod view_sync;
