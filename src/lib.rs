pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod reviews;
pub mod storage;
pub mod store;
pub mod types;
pub mod ui;

#[cfg(test)]
pub mod testing;
