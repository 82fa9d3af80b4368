// src/services/mod.rs

pub mod generator;
pub mod grading;
pub mod import;
pub mod lifecycle;
pub mod stats;
