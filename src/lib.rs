pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub mod testing;
