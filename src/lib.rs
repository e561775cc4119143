pub mod clients;
pub mod config;
pub mod errors;
pub mod format;
pub mod handlers;
pub mod models;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod submission;
pub mod wallet;
pub mod wizard;
