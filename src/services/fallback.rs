//! Deterministic tutor reply built from retrieved notes
//!
//! When the generative step is disabled or fails, the reply is assembled
//! directly from the chunk text: Q:/A: pairs become flashcards and
//! percent questions become quiz items with computed answers. Everything
//! here is pure and reproducible.

use crate::db::RetrievedChunk;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Reply language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ur,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub q: String,
    pub a: String,
}

/// The structured reply the tutor endpoint returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorReply {
    pub intent: String,
    pub explanation_kid: String,
    pub hints: Vec<String>,
    pub quiz: Vec<QuizItem>,
    pub flashcards: Vec<Flashcard>,
    pub followups: Vec<String>,
}

pub const MAX_FLASHCARDS: usize = 6;
pub const MAX_QUIZ: usize = 5;

fn qa_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)q:\s*(.+?)\s*a:\s*(.+?)(?:\n|$)").expect("valid regex"))
}

fn percent_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%\s*of\s*(\d+(?:\.\d+)?)").expect("valid regex")
    })
}

/// Integers print bare, everything else with two decimals
fn format_answer(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Compute the answer to a "P% of N" question, if the line contains one
fn percent_answer(line: &str) -> Option<String> {
    let caps = percent_regex().captures(line)?;
    let pct: f64 = caps.get(1)?.as_str().parse().ok()?;
    let num: f64 = caps.get(2)?.as_str().parse().ok()?;
    Some(format_answer(pct / 100.0 * num))
}

fn extract_flashcards(text: &str) -> Vec<Flashcard> {
    qa_regex()
        .captures_iter(text)
        .take(MAX_FLASHCARDS)
        .filter_map(|caps| {
            Some(Flashcard {
                front: caps.get(1)?.as_str().trim().to_string(),
                back: caps.get(2)?.as_str().trim().to_string(),
            })
        })
        .collect()
}

/// Quiz items come only from lines that are themselves percent questions;
/// a trailing "= ..." answer part is stripped before computing
fn extract_quiz(text: &str) -> Vec<QuizItem> {
    let mut quiz = Vec::new();
    for line in text.split(['\n', '\r']).map(str::trim) {
        if !line.ends_with('?') || !line.to_lowercase().contains("% of") {
            continue;
        }
        let question_part = line.split('=').next().unwrap_or(line);
        if let Some(a) = percent_answer(question_part) {
            quiz.push(QuizItem {
                q: line.to_string(),
                a,
            });
        }
        if quiz.len() >= MAX_QUIZ {
            break;
        }
    }
    quiz
}

/// Build an "explain" reply from retrieved chunks
pub fn extract(chunks: &[RetrievedChunk], language: Language) -> TutorReply {
    let text = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let (explanation_kid, hints, followups) = match language {
        Language::Ur => (
            "چلو آسان طریقے سے سمجھیں: فیصد کا مطلب سو میں سے ہے۔ مثال: 10% یعنی ہر سو میں دس۔"
                .to_string(),
            vec![
                "10% کے لیے عدد کو 10 پر تقسیم کریں۔".to_string(),
                "5% = 10% کا آدھا؛ 1% = 100 پر تقسیم۔".to_string(),
            ],
            vec![
                "مزید مثالیں آزمائیں؟".to_string(),
                "ننھی سی پزل کھیلیں؟".to_string(),
            ],
        ),
        Language::En => (
            "Let’s learn it simply: Percent means out of 100. For example, 10% means 10 out of every 100."
                .to_string(),
            vec![
                "10% = divide by 10.".to_string(),
                "5% is half of 10%; 1% = divide by 100.".to_string(),
            ],
            vec![
                "Try more examples?".to_string(),
                "Want a tiny puzzle?".to_string(),
            ],
        ),
    };

    TutorReply {
        intent: "explain".to_string(),
        explanation_kid,
        hints,
        quiz: extract_quiz(&text),
        flashcards: extract_flashcards(&text),
        followups,
    }
}

/// Reply used when retrieval found nothing for the subject
pub fn no_notes(language: Language) -> TutorReply {
    let (explanation_kid, followup) = match language {
        Language::Ur => (
            "ہم اس موضوع کے نوٹس نہیں ڈھونڈ سکے۔ آؤ ایک آسان قدم سے شروع کریں!",
            "کیا تم ضرب یا فیصد سیکھنا چاہتے ہو؟",
        ),
        Language::En => (
            "I couldn't find notes yet. Let's start with a simple step!",
            "Would you like multiplication or percentages?",
        ),
    };

    TutorReply {
        intent: "encourage".to_string(),
        explanation_kid: explanation_kid.to_string(),
        hints: Vec::new(),
        quiz: Vec::new(),
        flashcards: Vec::new(),
        followups: vec![followup.to_string()],
    }
}
