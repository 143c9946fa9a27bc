//! Record and collection data model.
//!
//! A [`CodeRecord`] is one classification code with its labels and keyword
//! lists. Records are bilingual: the primary-language fields are always
//! present, the alt-language fields are optional and fall back to the primary
//! values when absent. An [`EmbeddedRecord`] pairs a record with its
//! embedding vector, and a [`Collection`] is the full set of embedded records
//! produced by one provider/model pair.
//!
//! Wire (JSON) field names follow the dataset files: `menu`, `menu_vi`,
//! `description_vi`, `chapter`, `section`, `keywords_vi`, `embedding`.

use serde::{Deserialize, Serialize};

/// One classification code with its labels and keyword lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRecord {
    /// Classification code (e.g. "010121").
    pub code: String,
    /// Short display label.
    #[serde(rename = "menu")]
    pub label: String,
    /// Alt-language display label.
    #[serde(rename = "menu_vi", default, skip_serializing_if = "Option::is_none")]
    pub label_alt: Option<String>,
    /// Full description.
    pub description: String,
    /// Alt-language description.
    #[serde(
        rename = "description_vi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description_alt: Option<String>,
    /// Chapter-level grouping identifier.
    #[serde(rename = "chapter")]
    pub group_id: String,
    /// Section-level grouping identifier.
    #[serde(rename = "section")]
    pub section_id: String,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Alt-language search keywords.
    #[serde(
        rename = "keywords_vi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub keywords_alt: Option<Vec<String>>,
}

impl CodeRecord {
    /// Description in the given language, falling back to the primary
    /// language when no alt translation exists.
    pub fn description_for(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.description,
            Language::Alt => self.description_alt.as_deref().unwrap_or(&self.description),
        }
    }

    /// Keywords in the given language, falling back to the primary language
    /// when no alt translation exists.
    pub fn keywords_for(&self, language: Language) -> &[String] {
        match language {
            Language::Primary => &self.keywords,
            Language::Alt => self.keywords_alt.as_deref().unwrap_or(&self.keywords),
        }
    }
}

/// A record together with its embedding vector.
///
/// On the wire this flattens the record fields next to the `embedding`
/// array; unknown per-record fields (e.g. repeated `provider`/`model`
/// annotations written by the dataset generators) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    #[serde(flatten)]
    pub record: CodeRecord,
    #[serde(rename = "embedding")]
    pub vector: Vec<f32>,
}

/// All embedded records produced by one provider/model pair.
///
/// Provider, model, and dimension live here rather than on each record, so a
/// collection cannot hold records of mixed origin or mixed dimension by
/// construction. A loaded collection is immutable; the store replaces it
/// wholesale behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Provider identifier (e.g. "openai").
    pub provider_id: String,
    /// Model identifier within the provider.
    pub model_id: String,
    /// Embedding dimension shared by every record.
    pub dimension: usize,
    /// Embedded records in dataset order.
    pub records: Vec<EmbeddedRecord>,
}

impl Collection {
    /// Number of records in the collection.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Query-time language selector for the keyword fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    /// Primary dataset language.
    #[default]
    Primary,
    /// Alt-language fields, falling back per field to the primary language.
    Alt,
}

/// Which ranking path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Cosine similarity over embedding vectors.
    Vector,
    /// Keyword overlap over descriptions and keyword lists.
    Keyword,
}

/// A single ranked result.
#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub record: CodeRecord,
    pub score: f32,
    pub source: ResultSource,
}
