//! services/api/src/lib.rs
//!
//! The campus AI service: adapters, the generation pipeline and the REST surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod generation;
pub mod web;
