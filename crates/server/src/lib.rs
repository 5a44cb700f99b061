pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod orchestrator;
pub mod routes;
pub mod session;
pub mod store;
