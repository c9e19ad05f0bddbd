//! Securinets Registration Portal Library
//!
//! This library provides the core functionality of the event registration portal:
//! a public sign-up flow and an admin dashboard, with all persistence and
//! authentication delegated to a hosted backend (auth API + REST table API).
//!
//! # Features
//! - Registration form validation and sign-up with rollback
//! - Admin sessions bound to hosted backend access tokens
//! - Registration search, statistics and CSV export
//! - Rate limiting of sign-up and login attempts
//!
//! # Modules
//! - `backend`: hosted backend trait and its HTTP client
//! - `registration`: public sign-up flow
//! - `admin`: dashboard operations, statistics and export
//! - `session`: server-side admin sessions
//! - `web`: axum router, handlers and pages
//! - `config`: Configuration management
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use securinets_registration::{
//!     backend::SupabaseClient,
//!     config::Config,
//! };
//!
//! fn setup() -> anyhow::Result<()> {
//!     let config = Config::new()?;
//!     let _backend = Arc::new(SupabaseClient::new(&config.backend)?);
//!     Ok(())
//! }
//! ```
//!
//! # License
//! Licensed under the AGPLv3 license.

pub mod admin;
pub mod backend;
pub mod config;
pub mod error;
pub mod profile;
pub mod rate_limit;
pub mod registration;
pub mod session;
pub mod validation;
pub mod web;
