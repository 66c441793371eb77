pub mod dashboard;
pub mod error;
pub mod media;
pub mod models;
pub mod service;
pub mod store;
pub mod table;
pub mod users;

pub use error::Error;
