//! Shared types and configuration for Moneyvate.
//!
//! This crate provides common types used across all other crates:
//! - Money types with decimal precision and minor-unit conversion
//! - Typed IDs for goals and users
//! - Canonical calendar-day keys used by the goal document schema
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
