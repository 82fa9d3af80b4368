// src/services/grading.rs

use crate::models::question::{Question, QuestionKind};

/// Judges one submitted answer against the standard answer.
///
/// * `Choice`: both sides are sets of option letters, so order is ignored.
/// * `Judge` and `ShortAnswer`: verbatim equality, case and whitespace included.
pub fn judge(kind: QuestionKind, standard: &str, submitted: &str) -> bool {
    match kind {
        QuestionKind::Choice => sorted_chars(standard) == sorted_chars(submitted),
        QuestionKind::Judge | QuestionKind::ShortAnswer => standard == submitted,
    }
}

fn sorted_chars(s: &str) -> Vec<char> {
    let mut chars: Vec<char> = s.chars().collect();
    chars.sort_unstable();
    chars
}

/// Calculates the percentage score of a submission.
///
/// `questions` and `answers` are aligned by position. Returns `None` when the
/// lists are empty or differ in length; callers reject such submissions before
/// anything is stored. The result is rounded to two decimals.
pub fn score<S: AsRef<str>>(questions: &[Question], answers: &[S]) -> Option<f64> {
    if questions.is_empty() || questions.len() != answers.len() {
        return None;
    }

    let correct = questions
        .iter()
        .zip(answers)
        .filter(|(q, a)| judge(q.kind, &q.answer, a.as_ref()))
        .count();

    Some(round2(correct as f64 * 100.0 / questions.len() as f64))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
