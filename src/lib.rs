pub mod api;
pub mod center;
pub mod clients;
pub mod config;
pub mod models;
pub mod persistence;
pub mod store;
pub mod utils;
