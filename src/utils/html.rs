use crate::models::question::QuestionDraft;

/// Sanitizes the displayed parts of a question before it is stored.
///
/// Question text and explanation are rendered as HTML by the quiz page, so
/// they go through ammonia's whitelist. The standard answer is left verbatim
/// because short answers are graded by exact comparison.
pub fn sanitize_draft(draft: QuestionDraft) -> QuestionDraft {
    QuestionDraft {
        text: ammonia::clean(&draft.text),
        explanation: ammonia::clean(&draft.explanation),
        ..draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionKind;

    #[test]
    fn strips_scripts_but_keeps_answer() {
        let draft = QuestionDraft {
            text: "<b>Pick</b><script>alert(1)</script>".to_string(),
            kind: QuestionKind::ShortAnswer,
            answer: "<i>x</i>".to_string(),
            explanation: "<p onclick=\"x()\">why</p>".to_string(),
        };

        let clean = sanitize_draft(draft);
        assert_eq!(clean.text, "<b>Pick</b>");
        assert_eq!(clean.explanation, "<p>why</p>");
        assert_eq!(clean.answer, "<i>x</i>");
    }
}
