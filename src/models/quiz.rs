// src/models/quiz.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

use crate::services::lifecycle::QuizStatus;

/// How questions are sampled for the members of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMode {
    /// Every member draws an independent sample.
    #[serde(rename = "all random")]
    AllRandom,
    /// One sample is drawn and shared by every member.
    #[serde(rename = "random once")]
    RandomOnce,
}

impl DistributionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionMode::AllRandom => "all random",
            DistributionMode::RandomOnce => "random once",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown distribution mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for DistributionMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all random" => Ok(DistributionMode::AllRandom),
            "random once" => Ok(DistributionMode::RandomOnce),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for DistributionMode {
    type Error = UnknownMode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'quizzes' table in the database.
/// Immutable once created; deleting it removes its answer sheets.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,
    pub group_id: i64,
    pub question_count: i64,
    #[sqlx(try_from = "String")]
    pub mode: DistributionMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Quiz {
    pub fn status_at(&self, now: DateTime<Utc>) -> QuizStatus {
        QuizStatus::at(self.start_time, self.end_time, now)
    }
}

/// A quiz together with its lifecycle state at read time.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub status: QuizStatus,
}

/// DTO for creating a quiz and assigning it.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1, max = 500))]
    pub question_count: i64,
    pub mode: DistributionMode,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Member ids that each receive a personal answer sheet.
    #[serde(default)]
    pub members: Vec<i64>,
    /// Also create the public preview sheet reachable through a guest link.
    #[serde(default)]
    pub include_guest: bool,
}

/// Status filter for quiz listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Scheduled,
    Active,
    Closed,
}

impl StatusFilter {
    pub fn matches(self, status: QuizStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Scheduled => status == QuizStatus::Scheduled,
            StatusFilter::Active => status == QuizStatus::Active,
            StatusFilter::Closed => status == QuizStatus::Closed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    #[serde(default)]
    pub status: StatusFilter,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LinkParams {
    /// Member id; omitted for the guest sheet.
    pub subject: Option<i64>,
}

/// One page of a listing plus the offset of the next page, if any.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub new_offset: Option<i64>,
    pub total: i64,
}
