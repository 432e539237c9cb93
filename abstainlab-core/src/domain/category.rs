use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CategoryId;

/// What a correct answer looks like in a category.
///
/// Abstention categories (`irrelevance`, `live_irrelevance`) expect the model
/// to return an empty response; every other category expects a function call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Abstention,
    Invocation,
}

impl CategoryKind {
    /// Kind inferred from the category name. Callers with a different corpus
    /// layout override this through their analysis configuration.
    pub fn infer(category: &CategoryId) -> Self {
        if category.as_str().contains("irrelevance") {
            CategoryKind::Abstention
        } else {
            CategoryKind::Invocation
        }
    }

    pub fn expects_empty_response(self) -> bool {
        matches!(self, CategoryKind::Abstention)
    }
}

/// Category kinds with caller overrides on top of name inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryKinds {
    overrides: BTreeMap<CategoryId, CategoryKind>,
}

impl CategoryKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, category: impl Into<CategoryId>, kind: CategoryKind) -> Self {
        self.overrides.insert(category.into(), kind);
        self
    }

    pub fn kind_of(&self, category: &CategoryId) -> CategoryKind {
        self.overrides
            .get(category)
            .copied()
            .unwrap_or_else(|| CategoryKind::infer(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irrelevance_categories_are_abstention() {
        assert_eq!(
            CategoryKind::infer(&"irrelevance".into()),
            CategoryKind::Abstention
        );
        assert_eq!(
            CategoryKind::infer(&"live_irrelevance".into()),
            CategoryKind::Abstention
        );
    }

    #[test]
    fn relevance_is_not_abstention() {
        // live_relevance expects a call even though the name is close
        assert_eq!(
            CategoryKind::infer(&"live_relevance".into()),
            CategoryKind::Invocation
        );
        assert_eq!(CategoryKind::infer(&"simple".into()), CategoryKind::Invocation);
    }

    #[test]
    fn overrides_take_precedence() {
        let kinds = CategoryKinds::new().with_override("refusal", CategoryKind::Abstention);
        assert_eq!(kinds.kind_of(&"refusal".into()), CategoryKind::Abstention);
        assert_eq!(kinds.kind_of(&"simple".into()), CategoryKind::Invocation);
    }
}
