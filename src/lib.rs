pub mod configuration;
pub use configuration::*;

pub mod controller;
pub use controller::*;

pub mod error_handling;

pub mod gateway;

pub mod session_management;

pub mod snapshot_management;
