//! Library exports for the listings application
//!
//! This module exposes internal components for testing and potential library usage.

pub mod batch;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod listing;
pub mod middleware;
pub mod model;
pub mod principal;
pub mod query;
pub mod route;
pub mod search;
