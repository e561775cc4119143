//! Feedback survey with a branching question sequence.
//!
//! A low rating on the first question truncates the survey to the rating and
//! the closing free-text question. The active sequence is recomputed from
//! the answers every time it is read.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FieldErrors;

/// Ratings at or below this skip straight to the closing question.
pub const LOW_INTEREST_THRESHOLD: u64 = 2;
pub const AUTO_ADVANCE_DELAY_MS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    Rating,
    MultipleChoice,
    Range,
    MultiSelect,
    Text,
}

impl QuestionKind {
    fn auto_advances(self) -> bool {
        matches!(self, QuestionKind::Rating | QuestionKind::MultipleChoice)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestion {
    pub id: u8,
    pub kind: QuestionKind,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
    pub required: bool,
    /// (min, max, step) for range questions.
    pub range: Option<(u64, u64, u64)>,
}

pub static QUESTIONS: [SurveyQuestion; 5] = [
    SurveyQuestion {
        id: 1,
        kind: QuestionKind::Rating,
        prompt: "How interested would you be in this idea?",
        options: &[],
        required: true,
        range: None,
    },
    SurveyQuestion {
        id: 2,
        kind: QuestionKind::MultipleChoice,
        prompt: "Who do you think would benefit most from this?",
        options: &[
            "Young professionals (25-35)",
            "Fitness enthusiasts",
            "Tech-savvy users",
            "General population",
            "Other",
        ],
        required: true,
        range: None,
    },
    SurveyQuestion {
        id: 3,
        kind: QuestionKind::Range,
        prompt: "What would you expect to pay for this monthly?",
        options: &[],
        required: true,
        range: Some((0, 50, 5)),
    },
    SurveyQuestion {
        id: 4,
        kind: QuestionKind::MultiSelect,
        prompt: "What would make this idea more appealing?",
        options: &[
            "Better pricing",
            "More features",
            "Different target audience",
            "Improved user experience",
            "Integration capabilities",
            "Other",
        ],
        required: false,
        range: None,
    },
    SurveyQuestion {
        id: 5,
        kind: QuestionKind::Text,
        prompt: "Any additional thoughts or suggestions?",
        options: &[],
        required: false,
        range: None,
    },
];

const RATING_QUESTION: u8 = 1;
const CLOSING_QUESTION: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(u64),
    Text(String),
    Selections(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    current: usize,
    answers: BTreeMap<u8, Answer>,
    /// When a pending auto-advance from the current question takes effect.
    advance_at: Option<DateTime<Utc>>,
}

fn question(id: u8) -> Option<&'static SurveyQuestion> {
    QUESTIONS.iter().find(|q| q.id == id)
}

fn parse_answer(q: &SurveyQuestion, value: &Value) -> Result<Answer, String> {
    match q.kind {
        QuestionKind::Rating => match value.as_u64() {
            Some(n @ 1..=5) => Ok(Answer::Number(n)),
            _ => Err("Rating must be a whole number from 1 to 5".into()),
        },
        QuestionKind::MultipleChoice => match value.as_str() {
            Some(s) if q.options.contains(&s) => Ok(Answer::Text(s.to_string())),
            _ => Err("Choose one of the listed options".into()),
        },
        QuestionKind::Range => {
            let (min, max, step) = q.range.unwrap_or((0, u64::MAX, 1));
            match value.as_u64() {
                Some(n) if n >= min && n <= max && (n - min) % step.max(1) == 0 => {
                    Ok(Answer::Number(n))
                }
                _ => Err(format!("Pick a value from {min} to {max} in steps of {step}")),
            }
        }
        QuestionKind::MultiSelect => {
            let picks: Vec<String> = serde_json::from_value(value.clone())
                .map_err(|_| "Expected a list of options".to_string())?;
            if let Some(bad) = picks.iter().find(|p| !q.options.contains(&p.as_str())) {
                return Err(format!("Unknown option: {bad}"));
            }
            Ok(Answer::Selections(picks))
        }
        QuestionKind::Text => match value.as_str() {
            Some(s) => Ok(Answer::Text(s.to_string())),
            None => Err("Expected text".into()),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyStep {
    Advanced,
    /// Current question is the last active one; submit next.
    ReadyToSubmit,
}

impl Survey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously autosaved answers, starting at the first question.
    pub fn from_answers(answers: BTreeMap<u8, Answer>) -> Self {
        Survey {
            answers,
            ..Self::default()
        }
    }

    pub fn answers(&self) -> &BTreeMap<u8, Answer> {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn pending_advance(&self) -> Option<DateTime<Utc>> {
        self.advance_at
    }

    pub fn active_questions(&self) -> Vec<&'static SurveyQuestion> {
        let low_interest = matches!(
            self.answers.get(&RATING_QUESTION),
            Some(Answer::Number(n)) if *n <= LOW_INTEREST_THRESHOLD
        );
        if low_interest {
            [RATING_QUESTION, CLOSING_QUESTION]
                .into_iter()
                .filter_map(question)
                .collect()
        } else {
            QUESTIONS.iter().collect()
        }
    }

    pub fn current_question(&self) -> &'static SurveyQuestion {
        let active = self.active_questions();
        active[self.current.min(active.len() - 1)]
    }

    fn is_last(&self) -> bool {
        self.current + 1 >= self.active_questions().len()
    }

    /// Progress through the active sequence, counting the current question.
    pub fn progress(&self) -> u8 {
        let total = self.active_questions().len();
        (((self.current + 1) * 100 + total / 2) / total) as u8
    }

    pub fn is_current_answered(&self) -> bool {
        let q = self.current_question();
        if !q.required {
            return true;
        }
        match (q.kind, self.answers.get(&q.id)) {
            (QuestionKind::Rating, Some(Answer::Number(n))) => *n > 0,
            (QuestionKind::MultipleChoice, Some(Answer::Text(s))) => !s.is_empty(),
            (QuestionKind::Range, Some(Answer::Number(_))) => true,
            (QuestionKind::MultiSelect | QuestionKind::Text, _) => true,
            _ => false,
        }
    }

    /// Record an answer. Answering the current rating or single-choice
    /// question schedules an advance [`AUTO_ADVANCE_DELAY_MS`] after `at`.
    pub fn answer(&mut self, question_id: u8, value: &Value, at: DateTime<Utc>) -> Result<(), FieldErrors> {
        let key = format!("q{question_id}");
        let q = question(question_id).ok_or_else(|| {
            FieldErrors::from([(key.clone(), "Unknown question".to_string())])
        })?;
        let answer = parse_answer(q, value).map_err(|e| FieldErrors::from([(key, e)]))?;
        self.answers.insert(question_id, answer);

        let len = self.active_questions().len();
        if self.current >= len {
            self.current = len - 1;
        }
        self.advance_at = if self.current_question().id == question_id
            && q.kind.auto_advances()
            && !self.is_last()
        {
            Some(at + Duration::milliseconds(AUTO_ADVANCE_DELAY_MS))
        } else {
            None
        };
        Ok(())
    }

    /// Apply a pending auto-advance once its time has come.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.advance_at {
            Some(due) if now >= due => {
                self.advance_at = None;
                if self.is_current_answered() && !self.is_last() {
                    self.current += 1;
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    pub fn next(&mut self) -> Result<SurveyStep, FieldErrors> {
        self.advance_at = None;
        if !self.is_current_answered() {
            let q = self.current_question();
            return Err(FieldErrors::from([(
                format!("q{}", q.id),
                "This question requires an answer".to_string(),
            )]));
        }
        if self.is_last() {
            return Ok(SurveyStep::ReadyToSubmit);
        }
        self.current += 1;
        Ok(SurveyStep::Advanced)
    }

    pub fn back(&mut self) {
        self.advance_at = None;
        self.current = self.current.saturating_sub(1);
    }

    /// Check every required question in the active sequence.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (index, q) in self.active_questions().into_iter().enumerate() {
            let candidate = Survey {
                current: index,
                answers: self.answers.clone(),
                advance_at: None,
            };
            if !candidate.is_current_answered() {
                errors.insert(format!("q{}", q.id), "This question requires an answer".into());
            }
        }
        errors
    }

    /// One response line per active question, in order.
    pub fn responses(&self) -> Vec<String> {
        self.active_questions()
            .into_iter()
            .map(|q| {
                let text = match self.answers.get(&q.id) {
                    Some(Answer::Number(n)) if q.kind == QuestionKind::Rating => format!("{n}/5"),
                    Some(Answer::Number(n)) => format!("${n}/month"),
                    Some(Answer::Text(s)) => s.clone(),
                    Some(Answer::Selections(picks)) => picks.join(", "),
                    None => String::new(),
                };
                format!("{}: {}", q.prompt, text)
            })
            .collect()
    }
}
