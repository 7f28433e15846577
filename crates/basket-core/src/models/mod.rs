//! Data models for basket extraction.

pub mod config;
pub mod record;
pub mod table;
