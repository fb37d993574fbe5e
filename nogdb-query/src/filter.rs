//! `GraphFilter`: a property-condition filter plus the class-scope filter
//! used by walk and traversal operations. Matches the design note that
//! models both a declarative `MultiCondition` tree and a predicate closure
//! as variants of one filter type.

use crate::condition::{evaluate, MultiCondition, PropertyTypeMap};
use crate::record::DecodedRecord;
use nogdb_api::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Either a declarative condition tree or an opaque predicate over a
/// decoded record — both evaluated the same way by callers.
#[derive(Clone)]
pub enum Filter {
    Condition(MultiCondition),
    Predicate(Arc<dyn Fn(&DecodedRecord) -> bool + Send + Sync>),
}

impl Filter {
    pub fn condition(tree: impl Into<MultiCondition>) -> Self {
        Filter::Condition(tree.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&DecodedRecord) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, record: &DecodedRecord, types: &PropertyTypeMap) -> Result<bool> {
        match self {
            Filter::Condition(tree) => evaluate(tree, record, types),
            Filter::Predicate(f) => Ok(f(record)),
        }
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Condition(c) => f.debug_tuple("Condition").field(c).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A property filter plus the class-name whitelist/blacklist used by
/// walk/traversal to decide which edges to follow. An empty whitelist
/// means "follow every edge class" per §4.9.
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    pub filter: Option<Filter>,
    pub class_whitelist: HashSet<String>,
    pub class_blacklist: HashSet<String>,
}

impl GraphFilter {
    pub fn new() -> Self {
        GraphFilter::default()
    }

    pub fn with_condition(mut self, tree: impl Into<MultiCondition>) -> Self {
        self.filter = Some(Filter::condition(tree));
        self
    }

    pub fn with_predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&DecodedRecord) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Filter::predicate(f));
        self
    }

    pub fn only_classes<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.class_whitelist = names.into_iter().collect();
        self
    }

    pub fn exclude_classes<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.class_blacklist = names.into_iter().collect();
        self
    }

    pub fn allows_class(&self, name: &str) -> bool {
        if self.class_blacklist.contains(name) {
            return false;
        }
        self.class_whitelist.is_empty() || self.class_whitelist.contains(name)
    }

    pub fn matches(&self, record: &DecodedRecord, types: &PropertyTypeMap) -> Result<bool> {
        match &self.filter {
            Some(f) => f.matches(record, types),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Comparator, Condition, Operand};
    use nogdb_api::{Bytes, PropertyType, Value};
    use std::collections::HashMap;

    #[test]
    fn empty_whitelist_allows_everything_blacklist_still_excludes() {
        let gf = GraphFilter::new().exclude_classes(["bridge".to_string()]);
        assert!(gf.allows_class("ferry"));
        assert!(!gf.allows_class("bridge"));
    }

    #[test]
    fn whitelist_restricts_to_named_classes() {
        let gf = GraphFilter::new().only_classes(["ferry".to_string()]);
        assert!(gf.allows_class("ferry"));
        assert!(!gf.allows_class("bridge"));
    }

    #[test]
    fn predicate_filter_runs_arbitrary_closure() {
        let gf = GraphFilter::new().with_predicate(|r: &DecodedRecord| r.depth > 1);
        let mut types = HashMap::new();
        types.insert("x".to_string(), (1u16, PropertyType::Integer));
        let mut record = DecodedRecord::new();
        record.depth = 2;
        record.set_raw(1, Bytes::from_int(1));
        assert!(gf.matches(&record, &types).unwrap());
    }

    #[test]
    fn condition_filter_delegates_to_evaluator() {
        let gf = GraphFilter::new()
            .with_condition(Condition::new("x", Comparator::Eq, Operand::One(Value::Integer(7))));
        let mut types = HashMap::new();
        types.insert("x".to_string(), (1u16, PropertyType::Integer));
        let mut record = DecodedRecord::new();
        record.set_raw(1, Bytes::from_int(7));
        assert!(gf.matches(&record, &types).unwrap());
    }
}
