//! Process-local `ResultStore`

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{validate_segment, GroupResults, OracleBuckets, ResultStore};
use crate::Result;

#[derive(Debug, Default)]
struct Inner {
    results: BTreeMap<(String, String), GroupResults>,
    oracle: BTreeMap<String, OracleBuckets>,
}

/// In-memory result store (cheap to clone, clones share state)
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn load_group(&self, group: &str, solver_key: &str) -> Result<GroupResults> {
        let inner = self.inner.lock();
        Ok(inner
            .results
            .get(&(group.to_string(), solver_key.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn save_group(&self, group: &str, solver_key: &str, results: &GroupResults) -> Result<()> {
        validate_segment("group", group)?;
        validate_segment("solver key", solver_key)?;
        let mut inner = self.inner.lock();
        inner
            .results
            .insert((group.to_string(), solver_key.to_string()), results.clone());
        Ok(())
    }

    fn has_results(&self, group: &str, solver_key: &str) -> bool {
        self.inner
            .lock()
            .results
            .contains_key(&(group.to_string(), solver_key.to_string()))
    }

    fn groups(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        let mut groups: Vec<String> = inner
            .results
            .keys()
            .map(|(g, _)| g.clone())
            .chain(inner.oracle.keys().cloned())
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }

    fn load_oracle_buckets(&self, group: &str) -> Result<OracleBuckets> {
        Ok(self
            .inner
            .lock()
            .oracle
            .get(group)
            .cloned()
            .unwrap_or_default())
    }

    fn save_oracle_buckets(&self, group: &str, buckets: &OracleBuckets) -> Result<()> {
        validate_segment("group", group)?;
        buckets.validate()?;
        self.inner
            .lock()
            .oracle
            .insert(group.to_string(), buckets.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Identifier, OracleBucket};

    #[test]
    fn test_clones_share_state() {
        let store = InMemoryResultStore::new();
        let other = store.clone();

        let mut buckets = OracleBuckets::new();
        buckets.insert(OracleBucket::Sat, Identifier::new("aa"));
        store.save_oracle_buckets("G", &buckets).unwrap();
        store.save_group("G", "z3_z3", &GroupResults::new()).unwrap();

        assert!(other.has_results("G", "z3_z3"));
        assert_eq!(other.groups().unwrap(), vec!["G".to_string()]);
        assert_eq!(
            other.load_oracle().unwrap().lookup("G", &Identifier::new("aa")),
            Some(OracleBucket::Sat)
        );
    }
}
