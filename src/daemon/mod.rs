//! Monitor runtime: refresh controller, control loop, signal handling.

#[cfg(feature = "daemon")]
pub mod loop_main;
pub mod refresh;
#[cfg(feature = "daemon")]
pub mod signals;
