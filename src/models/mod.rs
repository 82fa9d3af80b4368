// src/models/mod.rs

pub mod answer_sheet;
pub mod question;
pub mod quiz;
