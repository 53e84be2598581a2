//! Train tracker server.
//!
//! A small HTTP API over a mock Hungarian railway dataset, backed by a
//! file-backed, time-expiring cache with a background auto-refresh loop.

pub mod cache;
pub mod dataset;
pub mod web;
