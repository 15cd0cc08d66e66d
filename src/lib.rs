pub mod api;
pub mod app;
pub mod archive;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod queue;
pub mod search;
pub mod services;
pub mod telemetry;
pub mod types;
pub mod upload;
pub mod version_range;
pub mod worker;
