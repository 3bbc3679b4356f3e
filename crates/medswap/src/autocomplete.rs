//! Medicine name autocomplete.
//!
//! Suggestions are case-insensitive substring matches over a small catalog,
//! returned in catalog order. A character trie over the same names answers
//! prefix completion.

use std::collections::BTreeMap;

use tracing::trace;

use crate::record::Record;

/// Default cap on the number of suggestions.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 8;

/// Medicines known without any stored records.
pub const BUILTIN_MEDICINES: &[&str] = &[
    "Paracetamol 500mg",
    "Amoxicillin 250mg",
    "Insulin Glargine 100U/ml",
    "Metformin 500mg",
    "Aspirin 75mg",
    "Omeprazole 20mg",
    "Levothyroxine 50mcg",
    "Atorvastatin 10mg",
];

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    word: Option<usize>,
}

/// Character trie over lowercased names, storing indexes into the catalog.
#[derive(Debug, Default)]
struct Trie {
    root: TrieNode,
}

impl Trie {
    fn insert(&mut self, name: &str, index: usize) {
        let node = name
            .to_lowercase()
            .chars()
            .fold(&mut self.root, |node, c| node.children.entry(c).or_default());
        if node.word.is_none() {
            node.word = Some(index);
        }
    }

    fn with_prefix(&self, prefix: &str) -> Vec<usize> {
        let mut node = &self.root;
        for c in prefix.to_lowercase().chars() {
            match node.children.get(&c) {
                Some(next) => node = next,
                None => return Vec::new(),
            }
        }

        let mut found = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            found.extend(n.word);
            stack.extend(n.children.values().rev());
        }
        found
    }
}

/// Known medicine names.
#[derive(Debug)]
pub struct MedicineCatalog {
    names: Vec<String>,
    trie: Trie,
    max_suggestions: usize,
}

impl Default for MedicineCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MedicineCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            trie: Trie::default(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.extend(BUILTIN_MEDICINES.iter().copied());
        catalog
    }

    /// Set the suggestion cap.
    #[must_use]
    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    /// Add a name unless it is blank or already known (ignoring case).
    ///
    /// Returns whether the name was added.
    pub fn insert(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        let index = self.names.len();
        self.trie.insert(name, index);
        self.names.push(name.to_string());
        true
    }

    /// Add several names.
    pub fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.insert(name);
        }
    }

    /// Learn the medicines named in stored records.
    pub fn learn_from(&mut self, records: &[Record]) {
        let before = self.names.len();
        self.extend(records.iter().map(|r| r.medicine.as_str()));
        trace!(added = self.names.len() - before, "Learned medicines from records");
    }

    /// Whether a name is known, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let lower = name.trim().to_lowercase();
        self.names.iter().any(|n| n.to_lowercase() == lower)
    }

    /// All names in catalog order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of known names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names containing `query`, ignoring case and surrounding whitespace.
    ///
    /// A blank query suggests nothing.
    #[must_use]
    pub fn suggest(&self, query: &str) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.names
            .iter()
            .filter(|n| n.to_lowercase().contains(&query))
            .take(self.max_suggestions)
            .map(String::as_str)
            .collect()
    }

    /// Names starting with `prefix`, ignoring case, in lexical order.
    #[must_use]
    pub fn complete_prefix(&self, prefix: &str) -> Vec<&str> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.trie
            .with_prefix(prefix)
            .into_iter()
            .filter_map(|i| self.names.get(i).map(String::as_str))
            .take(self.max_suggestions)
            .collect()
    }
}

/// Where a click landed relative to the autocomplete widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The text input itself.
    Input,
    /// Inside the suggestion list.
    Suggestions,
    /// Anywhere else.
    Outside,
}

/// State of an input with a suggestion list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutocompleteField {
    value: String,
    suggestions: Vec<String>,
}

impl AutocompleteField {
    /// An empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current input text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Currently listed suggestions.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Replace the input text and recompute the list.
    pub fn input(&mut self, catalog: &MedicineCatalog, text: &str) {
        self.value = text.to_string();
        self.suggestions = catalog
            .suggest(text)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    /// Pick a listed suggestion: fills the input and clears the list.
    ///
    /// Returns the chosen name, or `None` if `index` is out of range.
    pub fn select(&mut self, index: usize) -> Option<&str> {
        if index >= self.suggestions.len() {
            return None;
        }
        self.value = self.suggestions.swap_remove(index);
        self.suggestions.clear();
        Some(self.value.as_str())
    }

    /// Handle a click; anything outside the input and the list clears it.
    pub fn click(&mut self, target: ClickTarget) {
        if target == ClickTarget::Outside {
            self.suggestions.clear();
        }
    }
}
