pub mod api;
pub mod config;
pub mod http_client;
pub mod services;

pub use services::internet_status;
