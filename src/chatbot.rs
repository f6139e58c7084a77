use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::knowledge::{normalize, KnowledgeBase};
use crate::models::ChatReply;

pub const EMPTY_MESSAGE_PROMPT: &str =
    "Please ask me a question about Alzheimer's disease or brain health.";

pub const FALLBACK_SUFFIX: &str = " I can help you with information about Alzheimer's symptoms, prevention, treatment, caregiving, and brain health. What specific question do you have?";

/// Fuzzy matches must score strictly above this.
pub const SIMILARITY_THRESHOLD: f64 = 0.2;

pub const MAX_RELATED_QUERIES: usize = 5;

const STOP_WORDS: [&str; 21] = [
    "what", "is", "are", "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of",
    "with", "by", "how", "why", "when", "where",
];

/// Chooses which fallback answer to use when nothing matched.
pub trait FallbackPicker: Send + Sync {
    /// Index in `0..len`. Never called with `len == 0`.
    fn pick(&self, len: usize) -> usize;
}

pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FallbackPicker for SeededRandom {
    fn pick(&self, len: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..len)
    }
}

#[derive(Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl FallbackPicker for RoundRobin {
    fn pick(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Empty,
    Exact,
    Fuzzy,
    Keyword,
    Fallback,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Empty => "empty",
            MatchKind::Exact => "exact",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::Keyword => "keyword",
            MatchKind::Fallback => "fallback",
        }
    }
}

/// Answers with the first stage that succeeds: exact question lookup, Jaccard
/// word overlap against every question, keyword categories, then a fallback
/// chosen by the injected [`FallbackPicker`].
pub struct Chatbot {
    knowledge: Arc<KnowledgeBase>,
    picker: Box<dyn FallbackPicker>,
}

impl Chatbot {
    pub fn new(knowledge: Arc<KnowledgeBase>, picker: Box<dyn FallbackPicker>) -> Self {
        Self { knowledge, picker }
    }

    pub fn can_answer(&self) -> bool {
        !self.knowledge.is_empty()
    }

    pub fn reply(&self, message: &str) -> ChatReply {
        ChatReply {
            response: self.respond(message),
            related_queries: self.related_queries(message),
            can_answer: self.can_answer(),
        }
    }

    pub fn respond(&self, message: &str) -> String {
        let (kind, answer) = self.answer(message);
        tracing::debug!(stage = kind.as_str(), "chat message answered");
        answer
    }

    pub fn answer(&self, message: &str) -> (MatchKind, String) {
        let normalized = normalize(message);
        if normalized.is_empty() {
            return (MatchKind::Empty, EMPTY_MESSAGE_PROMPT.to_string());
        }

        if let Some(answer) = self.knowledge.exact(&normalized) {
            return (MatchKind::Exact, answer.to_string());
        }

        if let Some(answer) = self.best_fuzzy_match(&normalized) {
            return (MatchKind::Fuzzy, answer.to_string());
        }

        if let Some(answer) = self.keyword_match(&normalized) {
            return (MatchKind::Keyword, answer.to_string());
        }

        (MatchKind::Fallback, self.fallback())
    }

    fn best_fuzzy_match(&self, normalized: &str) -> Option<&str> {
        let message_words = content_words(normalized);
        if message_words.is_empty() {
            return None;
        }

        let mut best: Option<(f64, &str)> = None;
        for (question, answer) in self.knowledge.entries() {
            let question_words = content_words(question);
            if question_words.is_empty() {
                continue;
            }
            let score = jaccard(&message_words, &question_words);
            let best_score = best.map_or(0.0, |(s, _)| s);
            if score > SIMILARITY_THRESHOLD && score > best_score {
                best = Some((score, answer));
            }
        }

        best.map(|(_, answer)| answer)
    }

    fn keyword_match(&self, normalized: &str) -> Option<&str> {
        for keywords in self.knowledge.keywords() {
            let triggered = keywords
                .triggers
                .iter()
                .any(|trigger| !trigger.is_empty() && normalized.contains(trigger.as_str()));
            if !triggered {
                continue;
            }

            let found = self
                .knowledge
                .entries()
                .find(|(question, _)| question.contains(keywords.category.as_str()));
            if let Some((_, answer)) = found {
                return Some(answer);
            }
        }
        None
    }

    fn fallback(&self) -> String {
        let fallbacks = self.knowledge.fallbacks();
        let base = match fallbacks.len() {
            0 => crate::knowledge::GENERIC_FALLBACK,
            len => fallbacks[self.picker.pick(len) % len].as_str(),
        };
        format!("{base}{FALLBACK_SUFFIX}")
    }

    /// Up to five distinct knowledge base questions, title-cased, sharing at
    /// least one content word with the message. Callers should treat the
    /// result as an unordered set of suggestions.
    pub fn related_queries(&self, message: &str) -> Vec<String> {
        let normalized = normalize(message);
        let message_words = content_words(&normalized);
        if message_words.is_empty() {
            return Vec::new();
        }

        let mut related: Vec<String> = Vec::new();
        for (question, _) in self.knowledge.entries() {
            if related.len() == MAX_RELATED_QUERIES {
                break;
            }
            let shares_word = content_words(question)
                .iter()
                .any(|word| message_words.contains(word));
            if !shares_word {
                continue;
            }
            let titled = title_case(question);
            if !related.contains(&titled) {
                related.push(titled);
            }
        }
        related
    }
}

/// Words of already normalized text, edge punctuation trimmed and stop words
/// removed.
pub fn content_words(text: &str) -> HashSet<&str> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .collect()
}

pub fn jaccard<'a>(a: &HashSet<&'a str>, b: &HashSet<&'a str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(json: &str) -> Chatbot {
        let kb = KnowledgeBase::from_json_str(json).unwrap();
        Chatbot::new(Arc::new(kb), Box::<RoundRobin>::default())
    }

    fn builtin() -> Chatbot {
        Chatbot::new(
            Arc::new(KnowledgeBase::builtin().unwrap()),
            Box::new(SeededRandom::with_seed(7)),
        )
    }

    const THRESHOLD_KB: &str = r#"{
        "entries": [
            {"question": "alpha beta gamma delta epsilon", "answer": "five words"},
            {"question": "how and why", "answer": "only stop words"}
        ],
        "fallbacks": ["first fallback.", "second fallback."]
    }"#;

    #[test]
    fn empty_message_prompts_for_question() {
        let bot = builtin();
        assert_eq!(bot.respond(""), EMPTY_MESSAGE_PROMPT);
        assert_eq!(bot.respond("   "), EMPTY_MESSAGE_PROMPT);
        assert!(bot.related_queries("").is_empty());
    }

    #[test]
    fn exact_match_bypasses_fuzzy_scoring() {
        let bot = fixture(THRESHOLD_KB);
        // Every word is a stop word, so fuzzy matching could never pick it.
        assert_eq!(bot.answer("  How AND why ").0, MatchKind::Exact);
        assert_eq!(bot.respond("How and why"), "only stop words");
    }

    #[test]
    fn similarity_at_threshold_is_not_a_match() {
        let bot = fixture(THRESHOLD_KB);
        // 1 shared word out of 5 is exactly 0.2.
        let (kind, answer) = bot.answer("alpha");
        assert_eq!(kind, MatchKind::Fallback);
        assert_eq!(answer, format!("first fallback.{FALLBACK_SUFFIX}"));
    }

    #[test]
    fn similarity_above_threshold_matches() {
        let bot = fixture(
            r#"{"entries": [{"question": "alpha beta gamma delta", "answer": "four words"}]}"#,
        );
        assert_eq!(bot.answer("what is alpha?"), (MatchKind::Fuzzy, "four words".to_string()));
    }

    #[test]
    fn similarity_just_above_threshold_matches() {
        let bot = fixture(
            r#"{"entries": [
                {"question": "alpha beta gamma delta epsilon zeta eta", "answer": "seven words"}
            ]}"#,
        );
        // 2 shared words out of 9 distinct is about 0.222.
        assert_eq!(
            bot.answer("alpha beta kappa lambda"),
            (MatchKind::Fuzzy, "seven words".to_string())
        );
    }

    #[test]
    fn first_entry_wins_ties() {
        let bot = fixture(
            r#"{"entries": [
                {"question": "sleep apnea", "answer": "first"},
                {"question": "sleep hygiene", "answer": "second"}
            ]}"#,
        );
        assert_eq!(bot.respond("sleep trouble"), "first");
    }

    #[test]
    fn keyword_category_skips_categories_without_entries() {
        let bot = fixture(
            r#"{
                "entries": [{"question": "alzheimer stages", "answer": "stage answer"}],
                "keywords": [
                    {"category": "greeting", "triggers": ["hello"]},
                    {"category": "stages", "triggers": ["progression"]}
                ],
                "fallbacks": ["nothing found."]
            }"#,
        );
        assert_eq!(
            bot.answer("hello, tell me about progression"),
            (MatchKind::Keyword, "stage answer".to_string())
        );
        assert_eq!(bot.answer("hello there").0, MatchKind::Fallback);
    }

    #[test]
    fn round_robin_fallbacks_are_deterministic() {
        let bot = fixture(THRESHOLD_KB);
        assert_eq!(bot.respond("zzz"), format!("first fallback.{FALLBACK_SUFFIX}"));
        assert_eq!(bot.respond("zzz"), format!("second fallback.{FALLBACK_SUFFIX}"));
        assert_eq!(bot.respond("zzz"), format!("first fallback.{FALLBACK_SUFFIX}"));
    }

    #[test]
    fn seeded_fallbacks_repeat_for_the_same_seed() {
        let kb = Arc::new(KnowledgeBase::from_json_str(THRESHOLD_KB).unwrap());
        let a = Chatbot::new(kb.clone(), Box::new(SeededRandom::with_seed(42)));
        let b = Chatbot::new(kb, Box::new(SeededRandom::with_seed(42)));
        for _ in 0..5 {
            assert_eq!(a.respond("zzz"), b.respond("zzz"));
        }
    }

    #[test]
    fn empty_knowledge_base_answers_with_fallback_only() {
        let bot = Chatbot::new(Arc::new(KnowledgeBase::empty()), Box::<RoundRobin>::default());
        let reply = bot.reply("what is alzheimer");
        assert_eq!(
            reply.response,
            format!("{}{FALLBACK_SUFFIX}", crate::knowledge::GENERIC_FALLBACK)
        );
        assert!(reply.related_queries.is_empty());
        assert!(!reply.can_answer);
    }

    #[test]
    fn builtin_answers_common_questions() {
        let bot = builtin();
        assert_eq!(bot.answer("What is Alzheimer").0, MatchKind::Exact);

        let (kind, answer) = bot.answer("What are the early signs of Alzheimer?");
        assert_eq!(kind, MatchKind::Fuzzy);
        assert!(answer.starts_with("Early signs of Alzheimer's include"));
    }

    #[test]
    fn related_queries_are_capped_and_distinct() {
        let bot = builtin();
        let related = bot.related_queries("alzheimer");
        assert_eq!(related.len(), MAX_RELATED_QUERIES);
        let unique: HashSet<_> = related.iter().collect();
        assert_eq!(unique.len(), related.len());
        assert!(related.contains(&"What Is Alzheimer".to_string()));
        assert!(bot.related_queries("the and of").is_empty());
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a = content_words("memory loss");
        let b = content_words("sleep hygiene");
        assert_eq!(jaccard(&a, &b), 0.0);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("early stage alzheimer"), "Early Stage Alzheimer");
        assert_eq!(title_case("forgetfulness vs alzheimer"), "Forgetfulness Vs Alzheimer");
        assert_eq!(title_case("side-effects"), "Side-Effects");
    }
}
