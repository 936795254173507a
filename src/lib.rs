pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod params;
pub mod queries;
pub mod store;
pub mod validation;

pub use error::{Error, Result};
