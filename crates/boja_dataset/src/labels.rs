//! Label vocabulary: class name to positional class id.

use std::collections::HashMap;

/// Immutable mapping built once from the ordered label list. Ids are
/// positions in that list; a repeated name keeps its first position.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    names: Vec<String>,
    ids: HashMap<String, i64>,
}

impl LabelMap {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = labels.into_iter().map(Into::into).collect();
        let mut ids = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if ids.contains_key(name) {
                tracing::warn!(label = %name, index = idx, "duplicate label in vocabulary; keeping first id");
                continue;
            }
            ids.insert(name.clone(), idx as i64);
        }
        Self { names, ids }
    }

    pub fn id_of(&self, label: &str) -> Option<i64> {
        self.ids.get(label).copied()
    }

    pub fn name_of(&self, id: i64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
