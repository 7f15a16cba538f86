pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod routes;
pub mod storage;
pub mod store;
pub mod templates;
