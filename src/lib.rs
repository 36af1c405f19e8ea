pub mod client_ip;
pub mod config;
pub mod cors;
pub mod handler;
pub mod model;
pub mod response;
pub mod stats;
pub mod store;
