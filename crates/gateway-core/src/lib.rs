pub mod config;
pub mod error;
pub mod io;
pub mod permission;
pub mod repo;
pub mod role;
pub mod tokens;

pub use error::{GatewayError, Result};
