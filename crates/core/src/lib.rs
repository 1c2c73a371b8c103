//! Core business logic for inkpost.

pub mod services;

pub use services::*;
