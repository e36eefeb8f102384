//! Storage-agnostic traits and the read-through orchestration layer.

pub mod catalog;
pub mod repos;
