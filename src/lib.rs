//! pricewatch library
//!
//! This module exposes the cache, data, refresh and CLI modules for use in
//! integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod display;
pub mod refresh;
