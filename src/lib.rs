pub mod api;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod observability;
pub mod state;
