pub mod backup;
pub mod config;
pub mod database;
pub mod errors;
pub mod export;
pub mod groups;
pub mod ingest;
pub mod models;
pub mod web;
