mod auth;
mod config;
mod error;
mod models;
mod store;

pub use config::DriveConfig;
pub use store::DriveArchive;
