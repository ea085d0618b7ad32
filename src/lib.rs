pub mod chain;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod region;
pub mod render;
pub mod service;
pub mod synthetic;
