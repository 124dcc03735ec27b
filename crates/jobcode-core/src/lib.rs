pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod import;
pub mod io;
pub mod name;
pub mod reconcile;
pub mod roster;
pub mod sequence;
pub mod timesync;
pub mod types;

#[cfg(test)]
pub(crate) mod fakes;

pub use error::{JobcodeError, Result};
