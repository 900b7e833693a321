//! Personalized movie discovery API.
//!
//! Builds recommendation feeds from a third-party movie catalog and per-user
//! profiles (preferred genres, genre floor, watch history).

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
