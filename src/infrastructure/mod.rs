//! Infrastructure layer - Store clients, caches and services

pub mod cache;
pub mod logging;
pub mod services;
pub mod store;
