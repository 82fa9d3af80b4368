// src/services/generator.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, QuizError};
use crate::models::answer_sheet::{NewAnswerSheet, Subject};
use crate::models::question::Question;
use crate::models::quiz::{DistributionMode, Quiz};

/// Source of questions from an organization's bank.
#[async_trait]
pub trait QuestionPool: Send {
    /// Returns up to `count` distinct questions chosen uniformly at random.
    async fn random_questions(&mut self, group_id: i64, count: i64) -> Result<Vec<Question>, AppError>;
}

/// Destination for generated answer sheets.
#[async_trait]
pub trait SheetWriter: Send {
    /// Stores one sheet and returns its id.
    async fn insert_sheet(&mut self, sheet: &NewAnswerSheet) -> Result<i64, AppError>;
}

/// Creates one blank answer sheet per subject for `quiz`.
///
/// * `AllRandom`: each subject gets an independently drawn question list.
/// * `RandomOnce`: one list is drawn and every subject receives it.
///
/// Performs one write per subject and makes no atomicity assumption: if a
/// write fails, earlier sheets stay written unless `store` rolls them back.
pub async fn generate<S>(
    quiz: &Quiz,
    subjects: &[Subject],
    store: &mut S,
    now: DateTime<Utc>,
) -> Result<Vec<i64>, AppError>
where
    S: QuestionPool + SheetWriter,
{
    let shared = match quiz.mode {
        DistributionMode::RandomOnce => Some(draw(quiz, store).await?),
        DistributionMode::AllRandom => None,
    };

    let mut sheet_ids = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let question_ids = match &shared {
            Some(ids) => ids.clone(),
            None => draw(quiz, store).await?,
        };

        let sheet = NewAnswerSheet {
            subject: *subject,
            quiz_id: quiz.id,
            question_ids,
            completed_at: now,
        };
        sheet_ids.push(store.insert_sheet(&sheet).await?);
    }

    tracing::debug!(
        "Generated {} answer sheets for quiz {} ({})",
        sheet_ids.len(),
        quiz.id,
        quiz.mode.as_str()
    );

    Ok(sheet_ids)
}

async fn draw<S: QuestionPool>(quiz: &Quiz, store: &mut S) -> Result<Vec<i64>, AppError> {
    let questions = store
        .random_questions(quiz.group_id, quiz.question_count)
        .await?;

    let available = questions.len() as i64;
    if available < quiz.question_count {
        return Err(QuizError::InsufficientQuestions {
            requested: quiz.question_count,
            available,
        }
        .into());
    }

    Ok(questions.iter().map(|q| q.id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionKind;
    use rand::seq::SliceRandom;

    /// In-memory bank that records written sheets.
    struct MemoryBank {
        questions: Vec<Question>,
        sheets: Vec<NewAnswerSheet>,
        fail_after: Option<usize>,
    }

    impl MemoryBank {
        fn with_questions(n: i64) -> Self {
            let questions = (1..=n)
                .map(|id| Question {
                    id,
                    text: format!("Question {}", id),
                    kind: QuestionKind::Judge,
                    answer: "A".to_string(),
                    explanation: String::new(),
                    group_id: 1,
                })
                .collect();
            Self {
                questions,
                sheets: Vec::new(),
                fail_after: None,
            }
        }
    }

    #[async_trait]
    impl QuestionPool for MemoryBank {
        async fn random_questions(&mut self, group_id: i64, count: i64) -> Result<Vec<Question>, AppError> {
            let owned: Vec<&Question> = self
                .questions
                .iter()
                .filter(|q| q.group_id == group_id)
                .collect();
            let picked = {
                let mut rng = rand::thread_rng();
                owned
                    .choose_multiple(&mut rng, count as usize)
                    .map(|q| (*q).clone())
                    .collect()
            };
            Ok(picked)
        }
    }

    #[async_trait]
    impl SheetWriter for MemoryBank {
        async fn insert_sheet(&mut self, sheet: &NewAnswerSheet) -> Result<i64, AppError> {
            if self.fail_after == Some(self.sheets.len()) {
                return Err(AppError::InternalServerError("disk full".to_string()));
            }
            self.sheets.push(sheet.clone());
            Ok(self.sheets.len() as i64)
        }
    }

    fn quiz(mode: DistributionMode, question_count: i64) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: 9,
            name: "Weekly check".to_string(),
            group_id: 1,
            question_count,
            mode,
            start_time: now,
            end_time: now + chrono::Duration::hours(1),
        }
    }

    fn members(n: i64) -> Vec<Subject> {
        (100..100 + n).map(Subject::Personal).collect()
    }

    #[tokio::test]
    async fn random_once_shares_one_list() {
        let mut bank = MemoryBank::with_questions(50);
        let ids = generate(&quiz(DistributionMode::RandomOnce, 10), &members(5), &mut bank, Utc::now())
            .await
            .unwrap();

        assert_eq!(ids.len(), 5);
        let first = &bank.sheets[0].question_ids;
        assert_eq!(first.len(), 10);
        assert!(bank.sheets.iter().all(|s| &s.question_ids == first));
    }

    #[tokio::test]
    async fn all_random_draws_per_member() {
        let mut bank = MemoryBank::with_questions(50);
        generate(&quiz(DistributionMode::AllRandom, 10), &members(5), &mut bank, Utc::now())
            .await
            .unwrap();

        assert_eq!(bank.sheets.len(), 5);
        for sheet in &bank.sheets {
            let mut ids = sheet.question_ids.clone();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), 10, "questions are drawn without replacement");
        }
        let first = &bank.sheets[0].question_ids;
        assert!(bank.sheets.iter().skip(1).any(|s| &s.question_ids != first));
    }

    #[tokio::test]
    async fn sheets_start_blank_and_keep_subjects() {
        let mut bank = MemoryBank::with_questions(3);
        let now = Utc::now();
        let subjects = vec![Subject::Personal(1), Subject::Guest];
        generate(&quiz(DistributionMode::RandomOnce, 3), &subjects, &mut bank, now)
            .await
            .unwrap();

        assert_eq!(bank.sheets[0].subject, Subject::Personal(1));
        assert_eq!(bank.sheets[1].subject, Subject::Guest);
        assert!(bank.sheets.iter().all(|s| s.quiz_id == 9 && s.completed_at == now));
    }

    #[tokio::test]
    async fn small_bank_is_rejected() {
        let mut bank = MemoryBank::with_questions(4);
        let err = generate(&quiz(DistributionMode::AllRandom, 5), &members(2), &mut bank, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Quiz(QuizError::InsufficientQuestions {
                requested: 5,
                available: 4
            })
        ));
        assert!(bank.sheets.is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_earlier_sheets() {
        let mut bank = MemoryBank::with_questions(10);
        bank.fail_after = Some(2);
        let result = generate(&quiz(DistributionMode::AllRandom, 3), &members(4), &mut bank, Utc::now()).await;

        assert!(result.is_err());
        assert_eq!(bank.sheets.len(), 2);
    }
}
