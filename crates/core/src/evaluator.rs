//! Response Evaluation
//!
//! Classifies a learner's utterance against a sub-task. Evaluation is a pure
//! function of `(utterance, sub-task)` and is first-match-wins:
//!
//! 1. authored response rules, in declaration order;
//! 2. the sub-task's correct-answer keywords;
//! 3. the help-request lexicon;
//! 4. the generic incorrect fallback.
//!
//! Authored rules take precedence over both the correct-answer keywords and
//! the generic fallbacks. A keyword matches when its case-folded text,
//! punctuation included, appears in the utterance on word boundaries.

use crate::activity::SubTask;
use serde::{Serialize, Serializer};
use std::fmt;

const CORRECT_FEEDBACK: &str = "That's correct! Well done.";
const NEEDS_HELP_FEEDBACK: &str = "No problem, let's see if this helps.";
const INCORRECT_FEEDBACK: &str = "That's not quite it. Let's try a hint.";

/// Phrases that count as a request for help.
const HELP_LEXICON: &[&str] = &[
    "help",
    "idk",
    "i don't know",
    "i dont know",
    "clue",
    "hint",
    "not sure",
];

/// Classification of a learner response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutcomeTag {
    /// Terminal success for the sub-task.
    Correct,
    /// The learner asked for help.
    NeedsHelp,
    /// Nothing matched.
    IncorrectGeneric,
    /// An authored tag such as `partially_correct_setting`.
    Specific(String),
}

impl OutcomeTag {
    /// Parses an authored tag. Reserved names map onto the built-in variants.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "correct" => OutcomeTag::Correct,
            "needs_help" => OutcomeTag::NeedsHelp,
            "incorrect_generic" | "" => OutcomeTag::IncorrectGeneric,
            other => OutcomeTag::Specific(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutcomeTag::Correct => "correct",
            OutcomeTag::NeedsHelp => "needs_help",
            OutcomeTag::IncorrectGeneric => "incorrect_generic",
            OutcomeTag::Specific(tag) => tag,
        }
    }

    /// Whether this outcome should be answered from the help ladder.
    pub fn wants_help(&self) -> bool {
        matches!(self, OutcomeTag::NeedsHelp | OutcomeTag::IncorrectGeneric)
    }
}

impl fmt::Display for OutcomeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OutcomeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The result of evaluating one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub tag: OutcomeTag,
    pub feedback: String,
    pub follow_up: Option<String>,
}

impl Outcome {
    fn builtin(tag: OutcomeTag, feedback: &str) -> Self {
        Self {
            tag,
            feedback: feedback.to_string(),
            follow_up: None,
        }
    }
}

/// Case-folds `text`, straightens typographic apostrophes and collapses runs
/// of whitespace to a single space.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(['\u{2018}', '\u{2019}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `c` glues its neighbours into one word: an apostrophe between
/// letters ("don't") or `/`, `.`, `-` between digits ("5/12", "0.5").
fn joins(prev: Option<char>, c: char, next: Option<char>) -> bool {
    match c {
        '\'' => prev.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric),
        '/' | '.' | '-' => {
            prev.is_some_and(|p| p.is_ascii_digit()) && next.is_some_and(|n| n.is_ascii_digit())
        }
        _ => false,
    }
}

/// True when a match beginning at byte `start` does not begin mid-word.
fn starts_word(text: &str, start: usize) -> bool {
    let first = text[start..].chars().next();
    if !first.is_some_and(char::is_alphanumeric) {
        return true;
    }
    let mut before = text[..start].chars().rev();
    match before.next() {
        None => true,
        Some(c) if c.is_alphanumeric() => false,
        Some(c) => !joins(before.next(), c, first),
    }
}

/// True when a match ending at byte `end` does not stop mid-word.
fn ends_word(text: &str, end: usize) -> bool {
    let last = text[..end].chars().next_back();
    if !last.is_some_and(char::is_alphanumeric) {
        return true;
    }
    let mut after = text[end..].chars();
    match after.next() {
        None => true,
        Some(c) if c.is_alphanumeric() => false,
        Some(c) => !joins(last, c, after.next()),
    }
}

/// A normalized utterance that keywords can be matched against.
struct Normalized {
    text: String,
}

impl Normalized {
    fn new(utterance: &str) -> Self {
        Self {
            text: normalize(utterance),
        }
    }

    /// True when the keyword's normalized text, punctuation included,
    /// appears in the utterance starting and ending on word boundaries.
    fn contains(&self, keyword: &str) -> bool {
        let needle = normalize(keyword);
        if needle.is_empty() {
            return false;
        }
        let text = self.text.as_str();
        let mut from = 0;
        while let Some(offset) = text[from..].find(needle.as_str()) {
            let start = from + offset;
            if starts_word(text, start) && ends_word(text, start + needle.len()) {
                return true;
            }
            from = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        false
    }

    fn contains_any<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.iter().any(|k| self.contains(k.as_ref()))
    }
}

/// Classifies `utterance` against `sub_task`.
pub fn evaluate(utterance: &str, sub_task: &SubTask) -> Outcome {
    let normalized = Normalized::new(utterance);

    if let Some(rule) = sub_task
        .rules
        .iter()
        .find(|rule| normalized.contains_any(rule.keywords.as_slice()))
    {
        return Outcome {
            tag: rule.tag.clone(),
            feedback: rule.feedback.clone(),
            follow_up: rule.follow_up.clone(),
        };
    }

    if normalized.contains_any(sub_task.correct_keywords.as_slice()) {
        return Outcome::builtin(OutcomeTag::Correct, CORRECT_FEEDBACK);
    }

    if normalized.contains_any(HELP_LEXICON) {
        return Outcome::builtin(OutcomeTag::NeedsHelp, NEEDS_HELP_FEEDBACK);
    }

    Outcome::builtin(OutcomeTag::IncorrectGeneric, INCORRECT_FEEDBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{AuthoredActivity, SubTask};

    fn vocab_sub_task() -> SubTask {
        let raw: AuthoredActivity = serde_json::from_value(serde_json::json!({
            "key": "vocab",
            "sub_tasks": [{
                "name": "Vocabulary Check: 'Anxious'",
                "correct_answer_keywords": ["b", "worried"],
                "max_attempts": 2,
                "response_evaluations": [
                    { "keywords": ["a", "happy"], "status": "incorrect_opposite",
                      "feedback": "'Happy' is the opposite.", "next_action_prompt": "Try another option." },
                    { "keywords": ["c", "sleepy"], "status": "incorrect_unrelated",
                      "feedback": "'Sleepy' doesn't quite fit." }
                ]
            }]
        }))
        .unwrap();
        raw.validate().sub_tasks.remove(0)
    }

    #[test]
    fn test_correct_keyword_yields_correct() {
        let outcome = evaluate("I think it's B", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::Correct);
        assert_eq!(outcome.feedback, CORRECT_FEEDBACK);
        assert!(outcome.follow_up.is_none());
    }

    #[test]
    fn test_authored_rule_returned_verbatim() {
        let outcome = evaluate("HAPPY", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::Specific("incorrect_opposite".into()));
        assert_eq!(outcome.feedback, "'Happy' is the opposite.");
        assert_eq!(outcome.follow_up.as_deref(), Some("Try another option."));
    }

    #[test]
    fn test_rules_override_correct_keywords() {
        // "happy" hits the first rule even though "worried" is correct.
        let outcome = evaluate("happy or worried", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::Specific("incorrect_opposite".into()));
    }

    #[test]
    fn test_rule_declaration_order_wins() {
        let outcome = evaluate("sleepy and happy", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::Specific("incorrect_opposite".into()));
    }

    #[test]
    fn test_single_letter_keywords_match_whole_words_only() {
        // "maybe" and "about" contain the letters of rule keywords but not the words.
        let outcome = evaluate("maybe about that", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::IncorrectGeneric);
    }

    #[test]
    fn test_help_lexicon() {
        let st = vocab_sub_task();
        assert_eq!(evaluate("help", &st).tag, OutcomeTag::NeedsHelp);
        assert_eq!(evaluate("Hint please?", &st).tag, OutcomeTag::NeedsHelp);
        assert_eq!(evaluate("I don't know", &st).tag, OutcomeTag::NeedsHelp);
        assert_eq!(evaluate("idk", &st).tag, OutcomeTag::NeedsHelp);
        assert_eq!(evaluate("helpful", &st).tag, OutcomeTag::IncorrectGeneric);
    }

    #[test]
    fn test_generic_incorrect_fallback() {
        let outcome = evaluate("purple", &vocab_sub_task());
        assert_eq!(outcome.tag, OutcomeTag::IncorrectGeneric);
        assert_eq!(outcome.feedback, INCORRECT_FEEDBACK);
    }

    #[test]
    fn test_phrase_keywords_match_contiguous_tokens() {
        let normalized = Normalized::new("Tom found his kite, at last!");
        assert!(normalized.contains("found his kite"));
        assert!(!normalized.contains("his found kite"));
        assert!(!normalized.contains("   "));
    }

    fn fraction_sum_sub_task() -> SubTask {
        let catalog = crate::catalog::InMemoryCatalog::builtin().unwrap();
        let activity = catalog
            .activities()
            .into_iter()
            .find(|a| a.key == "fraction_addition_activity")
            .unwrap();
        activity
            .sub_tasks
            .iter()
            .find(|st| st.correct_keywords.iter().any(|k| k == "5/12"))
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_fraction_keyword_needs_the_whole_fraction() {
        let st = fraction_sum_sub_task();
        assert_eq!(evaluate("5/12", &st).tag, OutcomeTag::Correct);
        assert_eq!(evaluate("I got 5/12.", &st).tag, OutcomeTag::Correct);
        assert_eq!(evaluate("five twelfths", &st).tag, OutcomeTag::Correct);

        for wrong in ["1/5, 12 is the denominator", "5.12", "5-12", "I'd say 5 12", "15/12", "0.5/12"] {
            assert_ne!(evaluate(wrong, &st).tag, OutcomeTag::Correct, "{wrong}");
        }
    }

    #[test]
    fn test_fraction_rules_match_literally() {
        let st = fraction_sum_sub_task();
        assert_eq!(evaluate("is it 2/10?", &st).tag, st.rules[0].tag);
        assert_eq!(evaluate("2/24", &st).tag, st.rules[1].tag);
        assert_eq!(evaluate("2 10", &st).tag, OutcomeTag::IncorrectGeneric);
    }

    #[test]
    fn test_typographic_apostrophe_counts_as_apostrophe() {
        let st = vocab_sub_task();
        assert_eq!(evaluate("I don\u{2019}t know", &st).tag, OutcomeTag::NeedsHelp);
        assert_eq!(evaluate("I DON'T KNOW", &st).tag, OutcomeTag::NeedsHelp);
    }

    #[test]
    fn test_apostrophe_inside_word_is_not_a_boundary() {
        let normalized = Normalized::new("it's 'happy'");
        assert!(!normalized.contains("s"));
        assert!(!normalized.contains("it"));
        assert!(normalized.contains("happy"));
        assert!(normalized.contains("it's"));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let st = vocab_sub_task();
        let first = evaluate("c, sleepy", &st);
        for _ in 0..5 {
            assert_eq!(evaluate("c, sleepy", &st), first);
        }
    }

    #[test]
    fn test_outcome_tag_parse_and_serialize() {
        assert_eq!(OutcomeTag::parse("correct"), OutcomeTag::Correct);
        assert_eq!(OutcomeTag::parse("needs_help"), OutcomeTag::NeedsHelp);
        assert_eq!(OutcomeTag::parse(""), OutcomeTag::IncorrectGeneric);
        assert_eq!(
            serde_json::to_string(&OutcomeTag::Specific("partially_correct_setting".into())).unwrap(),
            "\"partially_correct_setting\""
        );
        assert!(OutcomeTag::NeedsHelp.wants_help());
        assert!(!OutcomeTag::Specific("x".into()).wants_help());
    }
}
