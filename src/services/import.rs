// src/services/import.rs

//! Bulk question import.
//!
//! Each record in the text is laid out line by line:
//!
//! ```text
//! <kind>            choice | judge | short answer
//!
//! <question>        one or more non-blank lines
//!
//! <answer>          one or more non-blank lines
//!
//! <explanation>     one or more non-blank lines
//!
//!                   separator, required unless the input ends here
//! ```
//!
//! Parsing is a single forward scan. The first violation aborts the whole
//! import with the 0-indexed line where the expectation failed.

use crate::error::QuizError;
use crate::models::question::{QuestionDraft, QuestionKind};

pub fn parse(text: &str) -> Result<Vec<QuestionDraft>, QuizError> {
    let mut scanner = Scanner {
        lines: text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect(),
        pos: 0,
    };
    let mut drafts = Vec::new();

    while !scanner.at_end() {
        let kind = scanner.kind()?;
        scanner.blank()?;
        let question = scanner.block("Question expected")?;
        scanner.blank()?;

        let answer_line = scanner.pos;
        let answer = scanner.block("Answer expected")?;
        check_answer(kind, &answer).map_err(|expected| QuizError::Grammar {
            line: answer_line,
            expected,
        })?;
        scanner.blank()?;

        let explanation = scanner.block("Explanation expected")?;
        scanner.blank()?;
        scanner.separator()?;

        drafts.push(QuestionDraft {
            text: question,
            kind,
            answer,
            explanation,
        });
    }

    Ok(drafts)
}

/// Kind-specific answer format. Shared with the single-question endpoints.
pub fn check_answer(kind: QuestionKind, answer: &str) -> Result<(), &'static str> {
    match kind {
        QuestionKind::Choice if !answer.chars().all(|c| c.is_ascii_uppercase()) => {
            Err("Choice answer must be uppercase A~Z")
        }
        QuestionKind::Judge if answer != "A" && answer != "B" => Err("Judge answer must be A or B"),
        _ => Ok(()),
    }
}

struct Scanner<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn current(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn fail(&self, expected: &'static str) -> QuizError {
        QuizError::Grammar {
            line: self.pos,
            expected,
        }
    }

    fn kind(&mut self) -> Result<QuestionKind, QuizError> {
        let kind = self
            .current()
            .and_then(|line| line.parse::<QuestionKind>().ok())
            .ok_or_else(|| self.fail("Question type expected"))?;
        self.pos += 1;
        Ok(kind)
    }

    fn blank(&mut self) -> Result<(), QuizError> {
        match self.current() {
            Some("") => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.fail("Empty line expected")),
        }
    }

    /// The line after a record must be blank unless the input is exhausted.
    fn separator(&mut self) -> Result<(), QuizError> {
        match self.current() {
            None => Ok(()),
            Some("") => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.fail("Empty line expected")),
        }
    }

    /// Consumes consecutive non-blank lines and joins them with newlines.
    fn block(&mut self, expected: &'static str) -> Result<String, QuizError> {
        let start = self.pos;
        while matches!(self.current(), Some(line) if !line.is_empty()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.fail(expected));
        }
        Ok(self.lines[start..self.pos].join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar_error(text: &str) -> (usize, &'static str) {
        match parse(text) {
            Err(QuizError::Grammar { line, expected }) => (line, expected),
            other => panic!("expected a grammar error, got {:?}", other),
        }
    }

    #[test]
    fn parses_a_single_record() {
        let drafts = parse("choice\n\nQ1\n\nA\n\nExp\n\n").unwrap();
        assert_eq!(
            drafts,
            vec![QuestionDraft {
                text: "Q1".to_string(),
                kind: QuestionKind::Choice,
                answer: "A".to_string(),
                explanation: "Exp".to_string(),
            }]
        );
    }

    #[test]
    fn parses_consecutive_records_and_multiline_bodies() {
        let text = "judge\n\nThe sky is blue.\n\nA\n\nUsually.\n\n\n\
                    short answer\n\nCapital of France?\nOne word.\n\nParis\n\nGeography.\nBasic.\n";
        let drafts = parse(text).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].kind, QuestionKind::Judge);
        assert_eq!(drafts[1].kind, QuestionKind::ShortAnswer);
        assert_eq!(drafts[1].text, "Capital of France?\nOne word.");
        assert_eq!(drafts[1].answer, "Paris");
        assert_eq!(drafts[1].explanation, "Geography.\nBasic.");
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let drafts = parse("judge\r\n\r\nQ\r\n\r\nB\r\n\r\nE\r\n\r\n").unwrap();
        assert_eq!(drafts[0].answer, "B");
        assert_eq!(drafts[0].explanation, "E");
    }

    #[test]
    fn missing_blank_after_kind_names_the_line() {
        assert_eq!(grammar_error("choice\nQ1\n\nA\n\nExp\n\n"), (1, "Empty line expected"));
    }

    #[test]
    fn missing_blank_after_explanation_names_the_line() {
        assert_eq!(grammar_error("choice\n\nQ1\n\nA\n\nExp"), (7, "Empty line expected"));
    }

    #[test]
    fn records_need_a_separator_line() {
        let text = "judge\n\nQ\n\nA\n\nE\n\njudge\n\nQ\n\nB\n\nE\n\n";
        assert_eq!(grammar_error(text), (8, "Empty line expected"));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(grammar_error("essay\n\nQ\n\nA\n\nE\n\n"), (0, "Question type expected"));
        assert_eq!(grammar_error(""), (0, "Question type expected"));
    }

    #[test]
    fn empty_sections_are_rejected() {
        assert_eq!(grammar_error("choice\n\n\n\nA\n\nE\n\n"), (2, "Question expected"));
        assert_eq!(grammar_error("choice\n\nQ\n\n\n\nE\n\n"), (4, "Answer expected"));
        assert_eq!(grammar_error("choice\n\nQ\n\nA\n\n\n"), (6, "Explanation expected"));
    }

    #[test]
    fn judge_answer_must_be_a_or_b() {
        assert_eq!(
            grammar_error("judge\n\nQ\n\nC\n\nE\n\n"),
            (4, "Judge answer must be A or B")
        );
    }

    #[test]
    fn choice_answer_must_be_uppercase_letters() {
        assert_eq!(
            grammar_error("choice\n\nQ\n\nAc\n\nE\n\n"),
            (4, "Choice answer must be uppercase A~Z")
        );
        assert!(parse("choice\n\nQ\n\nACD\n\nE\n\n").is_ok());
    }

    #[test]
    fn one_bad_record_discards_the_whole_import() {
        let text = "judge\n\nQ\n\nA\n\nE\n\n\njudge\n\nQ\n\nX\n\nE\n\n";
        assert!(parse(text).is_err());
    }
}
