pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod models;
pub mod services;
pub mod store;
