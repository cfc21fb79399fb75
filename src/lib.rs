pub mod cli;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod sources;
pub mod store;
pub mod token;
pub mod update;
