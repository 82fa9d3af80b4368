// src/handlers/mod.rs

pub mod answer_sheet;
pub mod questions;
pub mod quizzes;
