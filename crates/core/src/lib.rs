//! Maplecart Core - Shared types library.
//!
//! This crate provides common types used across all Maplecart components:
//! - `storefront` - Client SDK for the storefront REST backend
//! - `cli` - Command-line driver built on the SDK
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
