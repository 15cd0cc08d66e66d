pub mod history;
pub mod job;
pub mod package;
pub mod user;
pub mod version;
