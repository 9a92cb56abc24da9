pub mod auth;
pub mod button;
pub mod catalog;
pub mod configuration;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod startup;
pub mod store;
pub mod telemetry;
