//! `BettingGlossaryRegistry`: `getTerm`, `search`, `getSuggestions`,
//! `getTermsByCategory`, `getRelatedTerms`.
//!
//! Full-text search is explicitly out of scope; `search` does a
//! case-insensitive substring scan, which is sufficient for a glossary of
//! this size.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    pub category: String,
    pub related: Vec<String>,
}

pub trait GlossaryRegistry: Send + Sync {
    fn get_term(&self, term: &str) -> Option<GlossaryTerm>;
    fn search(&self, query: &str) -> Vec<GlossaryTerm>;
    fn get_suggestions(&self, prefix: &str, limit: usize) -> Vec<String>;
    fn get_terms_by_category(&self, category: &str) -> Vec<GlossaryTerm>;
    fn get_related_terms(&self, term: &str) -> Vec<GlossaryTerm>;
}

pub struct DefaultGlossaryRegistry {
    terms: Vec<GlossaryTerm>,
}

impl DefaultGlossaryRegistry {
    #[must_use]
    pub fn new() -> Self {
        let terms = vec![
            GlossaryTerm {
                term: "moneyline".to_string(),
                definition: "A bet on which team wins outright, with no point spread.".to_string(),
                category: "wager-types".to_string(),
                related: vec!["spread".to_string(), "favorite".to_string()],
            },
            GlossaryTerm {
                term: "spread".to_string(),
                definition: "A handicap applied to the favorite to even out the wager.".to_string(),
                category: "wager-types".to_string(),
                related: vec!["moneyline".to_string(), "cover".to_string()],
            },
            GlossaryTerm {
                term: "cover".to_string(),
                definition: "A team beats the spread assigned to it.".to_string(),
                category: "outcomes".to_string(),
                related: vec!["spread".to_string()],
            },
            GlossaryTerm {
                term: "favorite".to_string(),
                definition: "The side priced to win, carrying negative moneyline odds.".to_string(),
                category: "odds".to_string(),
                related: vec!["underdog".to_string(), "moneyline".to_string()],
            },
            GlossaryTerm {
                term: "underdog".to_string(),
                definition: "The side priced to lose, carrying positive moneyline odds.".to_string(),
                category: "odds".to_string(),
                related: vec!["favorite".to_string()],
            },
            GlossaryTerm {
                term: "parlay".to_string(),
                definition: "A single wager combining multiple selections that must all win.".to_string(),
                category: "wager-types".to_string(),
                related: vec!["moneyline".to_string(), "spread".to_string()],
            },
        ];
        Self { terms }
    }

    fn find(&self, term: &str) -> Option<&GlossaryTerm> {
        self.terms.iter().find(|t| t.term.eq_ignore_ascii_case(term))
    }
}

impl Default for DefaultGlossaryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GlossaryRegistry for DefaultGlossaryRegistry {
    fn get_term(&self, term: &str) -> Option<GlossaryTerm> {
        self.find(term).cloned()
    }

    fn search(&self, query: &str) -> Vec<GlossaryTerm> {
        let needle = query.to_ascii_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.terms
            .iter()
            .filter(|t| {
                t.term.to_ascii_lowercase().contains(&needle) || t.definition.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    fn get_suggestions(&self, prefix: &str, limit: usize) -> Vec<String> {
        let needle = prefix.to_ascii_lowercase();
        self.terms
            .iter()
            .filter(|t| t.term.to_ascii_lowercase().starts_with(&needle))
            .map(|t| t.term.clone())
            .take(limit)
            .collect()
    }

    fn get_terms_by_category(&self, category: &str) -> Vec<GlossaryTerm> {
        self.terms
            .iter()
            .filter(|t| t.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    fn get_related_terms(&self, term: &str) -> Vec<GlossaryTerm> {
        match self.find(term) {
            Some(entry) => entry
                .related
                .iter()
                .filter_map(|related| self.find(related).cloned())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_term_is_case_insensitive() {
        let glossary = DefaultGlossaryRegistry::new();
        assert!(glossary.get_term("MONEYLINE").is_some());
    }

    #[test]
    fn search_matches_definition_substring() {
        let glossary = DefaultGlossaryRegistry::new();
        let results = glossary.search("handicap");
        assert!(results.iter().any(|t| t.term == "spread"));
    }

    #[test]
    fn suggestions_respect_limit() {
        let glossary = DefaultGlossaryRegistry::new();
        let suggestions = glossary.get_suggestions("", 2);
        assert_eq!(suggestions.len(), 2);
    }

    #[test]
    fn terms_by_category_filters_correctly() {
        let glossary = DefaultGlossaryRegistry::new();
        let odds_terms = glossary.get_terms_by_category("odds");
        assert!(odds_terms.iter().all(|t| t.category == "odds"));
        assert_eq!(odds_terms.len(), 2);
    }

    #[test]
    fn related_terms_resolve_through_graph() {
        let glossary = DefaultGlossaryRegistry::new();
        let related = glossary.get_related_terms("spread");
        assert!(related.iter().any(|t| t.term == "cover"));
    }

    #[test]
    fn unknown_term_has_no_relations() {
        let glossary = DefaultGlossaryRegistry::new();
        assert!(glossary.get_related_terms("nonexistent").is_empty());
    }
}
