pub mod jobs;
pub mod metrics;
pub mod openapi;
pub mod packages;
pub mod reset;
pub mod users;
