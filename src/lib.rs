//! initiative-insights: activity aggregation and automation scoring for the
//! initiatives dashboard.
//!
//! The engine modules (`period`, `aggregate`, `scoring`, `ranking`,
//! `progress`) are pure over in-memory snapshots. `backend` talks to the
//! initiatives REST API and `api` serves the results over HTTP.

pub mod aggregate;
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod period;
pub mod progress;
pub mod projections;
pub mod ranking;
pub mod scoring;
pub mod session;

pub use api::{create_router, AppState};
pub use backend::BackendClient;
pub use config::Config;
