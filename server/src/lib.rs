//! EventDesk Server - Event listings with a single-admin write surface.
//!
//! This crate provides:
//! - A public, read-only view of upcoming events
//! - Admin login with one shared password, issuing bearer session tokens
//! - An auth guard protecting every event write
//!
//! # Architecture
//!
//! Sessions and events live in memory behind `RwLock`s; a restart drops both.
//! Sessions expire 24 hours after login. Expiry is checked lazily on every
//! validation, and a background sweep reclaims expired entries.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod session;
