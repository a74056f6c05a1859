pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod repository;
pub mod services;
pub mod tx;

pub use error::{Error, Result};
