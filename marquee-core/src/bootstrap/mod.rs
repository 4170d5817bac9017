//! Bootstrap module for initializing the Marquee server
//!
//! This module handles:
//! - Configuration loading
//! - Database initialization
//! - Layout store construction for the configured backend

pub mod config;
pub mod database;
pub mod services;

pub use config::load_config;
pub use database::init_database;
pub use services::{init_catalog, init_layout_store};
