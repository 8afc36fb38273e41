pub mod clock;
pub mod log;
pub mod monitor;
pub mod notify;
pub mod roles;
pub mod rollover;
pub mod state_machine;
pub mod store;
