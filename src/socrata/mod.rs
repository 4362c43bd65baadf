// src/socrata/mod.rs
pub mod client;
pub mod models;
