//! GymDesk Core Types
//!
//! This crate provides the fundamental types shared across GymDesk:
//! - Domain records returned by the gym backend (clients, payments, attendance, reports)
//! - Pagination types
//! - Client-side input validation
//! - Core error types

pub mod error;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
