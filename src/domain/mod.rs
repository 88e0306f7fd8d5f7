pub mod cycle;
pub mod models;
pub mod timer_state;
