pub mod app;
pub mod auth;
pub mod config;
pub mod courses;
pub mod error;
pub mod meetings;
pub mod payments;
pub mod spaces;
pub mod state;
pub mod store;
pub mod users;
