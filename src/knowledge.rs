use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::KnowledgeError;

const BUILTIN: &str = include_str!("../data/knowledge_base.json");

/// Answer used when no knowledge base could be loaded.
pub const GENERIC_FALLBACK: &str =
    "I'm here to help with Alzheimer's information. Please ask me a specific question.";

#[derive(Debug, Deserialize)]
struct KnowledgeDocument {
    #[serde(default)]
    entries: Vec<EntryDocument>,
    #[serde(default)]
    keywords: Vec<KeywordCategory>,
    #[serde(default)]
    fallbacks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EntryDocument {
    question: String,
    answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordCategory {
    pub category: String,
    pub triggers: Vec<String>,
}

/// Canned question/answer pairs with keyword categories and fallback answers.
///
/// Entries, categories and fallbacks keep the order of the source document;
/// matching walks them in that order.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    keywords: Vec<KeywordCategory>,
    fallbacks: Vec<String>,
}

impl KnowledgeBase {
    /// Fallback-only knowledge base.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            keywords: Vec::new(),
            fallbacks: vec![GENERIC_FALLBACK.to_string()],
        }
    }

    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_json_str(BUILTIN)
    }

    pub fn from_path(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, KnowledgeError> {
        let document: KnowledgeDocument = serde_json::from_str(raw)?;

        let mut entries = Vec::with_capacity(document.entries.len());
        let mut index = HashMap::with_capacity(document.entries.len());
        for entry in document.entries {
            let key = normalize(&entry.question);
            if key.is_empty() || index.contains_key(&key) {
                tracing::debug!(question = %entry.question, "skipping empty or duplicate question");
                continue;
            }
            index.insert(key.clone(), entries.len());
            entries.push((key, entry.answer));
        }

        let keywords = document
            .keywords
            .into_iter()
            .map(|category| KeywordCategory {
                category: normalize(&category.category),
                triggers: category.triggers.iter().map(|t| normalize(t)).collect(),
            })
            .collect();

        let fallbacks = if document.fallbacks.is_empty() {
            vec![GENERIC_FALLBACK.to_string()]
        } else {
            document.fallbacks
        };

        Ok(Self {
            entries,
            index,
            keywords,
            fallbacks,
        })
    }

    /// Loads the file at `path`, or the compiled-in data when no path is
    /// given. Any failure degrades to [`KnowledgeBase::empty`].
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        };

        match loaded {
            Ok(kb) => {
                tracing::info!(
                    entries = kb.len(),
                    categories = kb.keywords.len(),
                    "knowledge base loaded"
                );
                kb
            }
            Err(err) => {
                tracing::warn!(error = %err, "knowledge base unavailable, answering with fallbacks only");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer for an already normalized question.
    pub fn exact(&self, question: &str) -> Option<&str> {
        self.index
            .get(question)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn keywords(&self) -> &[KeywordCategory] {
        &self.keywords
    }

    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }
}

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
