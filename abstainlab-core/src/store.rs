//! Run store — every validated `RunResult` of a campaign, grouped into `RunSet`s.
//!
//! Configurations and categories are remembered in first-seen order so that
//! downstream reports never depend on hash-map iteration order.

use std::collections::HashMap;

use crate::domain::{CategoryId, ConfigName, RunResult, RunSet, RunSetError};

#[derive(Debug, Clone, Default)]
pub struct RunStore {
    configurations: Vec<ConfigName>,
    categories: Vec<CategoryId>,
    sets: HashMap<(ConfigName, CategoryId), RunSet>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated results, in the given order.
    pub fn from_results<I>(results: I) -> Result<Self, RunSetError>
    where
        I: IntoIterator<Item = RunResult>,
    {
        let mut store = Self::new();
        for result in results {
            store.insert(result)?;
        }
        Ok(store)
    }

    /// Add one result. A rejected result leaves the store unchanged.
    pub fn insert(&mut self, result: RunResult) -> Result<(), RunSetError> {
        let (configuration, category) = (result.configuration.clone(), result.category.clone());
        let key = (configuration.clone(), category.clone());
        match self.sets.get_mut(&key) {
            Some(set) => set.push(result)?,
            None => {
                let mut set = RunSet::new(configuration.clone(), category.clone());
                set.push(result)?;
                self.sets.insert(key, set);
            }
        }
        if !self.configurations.contains(&configuration) {
            self.configurations.push(configuration);
        }
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        Ok(())
    }

    /// Configurations in first-seen order.
    pub fn configurations(&self) -> &[ConfigName] {
        &self.configurations
    }

    /// Categories in first-seen order.
    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    pub fn get(&self, configuration: &ConfigName, category: &CategoryId) -> Option<&RunSet> {
        self.sets.get(&(configuration.clone(), category.clone()))
    }

    pub fn contains_configuration(&self, configuration: &ConfigName) -> bool {
        self.configurations.contains(configuration)
    }

    /// Largest run count across the configuration's categories.
    pub fn run_count(&self, configuration: &ConfigName) -> usize {
        self.categories
            .iter()
            .filter_map(|c| self.get(configuration, c))
            .map(RunSet::len)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Run sets in (configuration, category) first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &RunSet> {
        self.configurations.iter().flat_map(move |cfg| {
            self.categories
                .iter()
                .filter_map(move |cat| self.get(cfg, cat))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cfg: &str, cat: &str, correct: u32) -> RunResult {
        RunResult {
            configuration: cfg.into(),
            category: cat.into(),
            run: None,
            total: 10,
            correct,
            correctly_empty: None,
            recorded_at: None,
        }
    }

    #[test]
    fn first_seen_order_is_kept() {
        let store = RunStore::from_results(vec![
            result("zero_output", "simple", 9),
            result("baseline", "irrelevance", 6),
            result("baseline", "simple", 8),
            result("zero_output", "irrelevance", 7),
        ])
        .unwrap();

        let cfgs: Vec<&str> = store.configurations().iter().map(|c| c.as_str()).collect();
        assert_eq!(cfgs, vec!["zero_output", "baseline"]);
        let cats: Vec<&str> = store.categories().iter().map(|c| c.as_str()).collect();
        assert_eq!(cats, vec!["simple", "irrelevance"]);

        let order: Vec<(String, String)> = store
            .iter()
            .map(|s| (s.configuration().to_string(), s.category().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("zero_output".into(), "simple".into()),
                ("zero_output".into(), "irrelevance".into()),
                ("baseline".into(), "simple".into()),
                ("baseline".into(), "irrelevance".into()),
            ]
        );
    }

    #[test]
    fn runs_accumulate_per_cell() {
        let store = RunStore::from_results(vec![
            result("baseline", "simple", 8),
            result("baseline", "simple", 9),
            result("baseline", "irrelevance", 5),
        ])
        .unwrap();
        let set = store.get(&"baseline".into(), &"simple".into()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(store.run_count(&"baseline".into()), 2);
        assert_eq!(store.run_count(&"missing".into()), 0);
    }

    #[test]
    fn corpus_size_mismatch_propagates() {
        let mut bad = result("baseline", "simple", 3);
        bad.total = 11;
        let err = RunStore::from_results(vec![result("baseline", "simple", 3), bad]).unwrap_err();
        assert!(matches!(err, RunSetError::CorpusSizeMismatch { .. }));
    }

    #[test]
    fn rejected_result_leaves_store_unchanged() {
        let mut store = RunStore::from_results(vec![result("baseline", "simple", 3)]).unwrap();
        let mut bad = result("zero_output", "irrelevance", 3);
        bad.correct = bad.total + 1;

        let err = store.insert(bad).unwrap_err();
        assert!(matches!(err, RunSetError::InconsistentCounts { .. }));
        assert_eq!(store.configurations(), &[ConfigName::new("baseline")]);
        assert_eq!(store.categories(), &[CategoryId::new("simple")]);
        assert!(store.get(&"zero_output".into(), &"irrelevance".into()).is_none());
        assert_eq!(store.len(), 1);
    }
}
