pub mod cache;
pub mod config;
pub mod handlers;
pub mod models;
pub mod payment;
pub mod reservation;
pub mod routes;
pub mod store;
pub mod utils;
