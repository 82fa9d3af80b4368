// src/services/stats.rs

use serde::Serialize;

use crate::models::answer_sheet::{AnswerSheet, Subject};

/// Completion summary of a quiz over its members' sheets.
/// Guest preview sheets are never counted.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct QuizStats {
    pub total_members: usize,
    pub completed_members: usize,
    pub distribution: ScoreDistribution,
}

/// Histogram of member scores.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub ungraded: usize,
    #[serde(rename = "0-59")]
    pub below_60: usize,
    #[serde(rename = "60-79")]
    pub from_60: usize,
    #[serde(rename = "80-99")]
    pub from_80: usize,
    #[serde(rename = "100")]
    pub perfect: usize,
}

impl QuizStats {
    pub fn from_sheets(sheets: &[AnswerSheet]) -> Self {
        let mut stats = QuizStats::default();

        for sheet in sheets {
            if sheet.subject == Subject::Guest {
                continue;
            }
            stats.total_members += 1;

            let dist = &mut stats.distribution;
            match sheet.grade() {
                None => dist.ungraded += 1,
                Some(score) => {
                    stats.completed_members += 1;
                    if score < 60.0 {
                        dist.below_60 += 1;
                    } else if score < 80.0 {
                        dist.from_60 += 1;
                    } else if score < 100.0 {
                        dist.from_80 += 1;
                    } else {
                        dist.perfect += 1;
                    }
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sheet(subject: Subject, score: Option<f64>) -> AnswerSheet {
        AnswerSheet {
            id: 0,
            subject,
            quiz_id: 1,
            question_ids: vec![1],
            answers: vec![],
            score,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn buckets_member_scores_and_skips_guest() {
        let sheets = vec![
            sheet(Subject::Personal(1), None),
            sheet(Subject::Personal(2), Some(59.99)),
            sheet(Subject::Personal(3), Some(60.0)),
            sheet(Subject::Personal(4), Some(80.0)),
            sheet(Subject::Personal(5), Some(100.0)),
            sheet(Subject::Guest, Some(100.0)),
        ];

        let stats = QuizStats::from_sheets(&sheets);
        assert_eq!(stats.total_members, 5);
        assert_eq!(stats.completed_members, 4);
        assert_eq!(
            stats.distribution,
            ScoreDistribution {
                ungraded: 1,
                below_60: 1,
                from_60: 1,
                from_80: 1,
                perfect: 1,
            }
        );
    }
}
