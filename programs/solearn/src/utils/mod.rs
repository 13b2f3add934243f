//! Shared utilities for instruction handlers

pub mod commitment;
pub mod validation;
