pub mod aggregator;
pub mod analysis;
pub mod api;
pub mod chain;
pub mod config;
pub mod explorer;
pub mod format;
pub mod growth;
pub mod models;
pub mod projector;
pub mod stats;
