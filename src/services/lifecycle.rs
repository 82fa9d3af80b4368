// src/services/lifecycle.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::models::answer_sheet::{AnswerSheet, Subject};

/// Lifecycle state of a quiz, recomputed on every read from its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Scheduled,
    Active,
    Closed,
}

impl QuizStatus {
    /// Both window bounds are inclusive for `Active`.
    pub fn at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            QuizStatus::Scheduled
        } else if now > end {
            QuizStatus::Closed
        } else {
            QuizStatus::Active
        }
    }
}

/// Gate for submissions.
///
/// Allowed while the quiz is active, and after it closed only for an
/// ungraded guest sheet (the public preview stays answerable).
pub fn ensure_submittable(status: QuizStatus, subject: Subject, graded: bool) -> Result<(), QuizError> {
    match (status, subject) {
        (QuizStatus::Active, _) => Ok(()),
        (QuizStatus::Closed, Subject::Guest) if !graded => Ok(()),
        _ => Err(QuizError::OutOfWindow(status)),
    }
}

/// Gate for opening a sheet through its link.
///
/// A closed quiz can still be opened to review a graded personal sheet,
/// and the guest preview can always be opened once the quiz has started.
pub fn ensure_viewable(status: QuizStatus, sheet: &AnswerSheet) -> Result<(), QuizError> {
    match status {
        QuizStatus::Scheduled => Err(QuizError::OutOfWindow(status)),
        QuizStatus::Active => Ok(()),
        QuizStatus::Closed => match sheet.subject {
            Subject::Guest => Ok(()),
            Subject::Personal(_) if sheet.is_graded() => Ok(()),
            Subject::Personal(_) => Err(QuizError::OutOfWindow(status)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn sheet(subject: Subject, score: Option<f64>) -> AnswerSheet {
        AnswerSheet {
            id: 1,
            subject,
            quiz_id: 1,
            question_ids: vec![1, 2],
            answers: vec![],
            score,
            completed_at: t0(),
        }
    }

    #[test]
    fn status_follows_the_window() {
        let start = t0() + Duration::hours(1);
        let end = t0() + Duration::hours(2);

        assert_eq!(QuizStatus::at(start, end, t0()), QuizStatus::Scheduled);
        assert_eq!(
            QuizStatus::at(start, end, t0() + Duration::minutes(90)),
            QuizStatus::Active
        );
        assert_eq!(
            QuizStatus::at(start, end, t0() + Duration::hours(3)),
            QuizStatus::Closed
        );
    }

    #[test]
    fn window_bounds_are_active() {
        let start = t0();
        let end = t0() + Duration::hours(1);
        assert_eq!(QuizStatus::at(start, end, start), QuizStatus::Active);
        assert_eq!(QuizStatus::at(start, end, end), QuizStatus::Active);
    }

    #[test]
    fn active_quiz_accepts_everyone() {
        assert!(ensure_submittable(QuizStatus::Active, Subject::Personal(3), false).is_ok());
        assert!(ensure_submittable(QuizStatus::Active, Subject::Personal(3), true).is_ok());
        assert!(ensure_submittable(QuizStatus::Active, Subject::Guest, false).is_ok());
    }

    #[test]
    fn scheduled_quiz_rejects_submissions() {
        assert_eq!(
            ensure_submittable(QuizStatus::Scheduled, Subject::Guest, false),
            Err(QuizError::OutOfWindow(QuizStatus::Scheduled))
        );
    }

    #[test]
    fn closed_quiz_only_accepts_ungraded_guest() {
        assert!(ensure_submittable(QuizStatus::Closed, Subject::Guest, false).is_ok());
        assert_eq!(
            ensure_submittable(QuizStatus::Closed, Subject::Personal(3), true),
            Err(QuizError::OutOfWindow(QuizStatus::Closed))
        );
        assert!(ensure_submittable(QuizStatus::Closed, Subject::Personal(3), false).is_err());
    }

    #[test]
    fn closed_quiz_can_be_reviewed_once_graded() {
        let graded = sheet(Subject::Personal(2), Some(50.0));
        let pending = sheet(Subject::Personal(2), None);
        let guest = sheet(Subject::Guest, Some(50.0));

        assert!(ensure_viewable(QuizStatus::Closed, &graded).is_ok());
        assert!(ensure_viewable(QuizStatus::Closed, &pending).is_err());
        assert!(ensure_viewable(QuizStatus::Closed, &guest).is_ok());
        assert!(ensure_viewable(QuizStatus::Scheduled, &graded).is_err());
    }
}
