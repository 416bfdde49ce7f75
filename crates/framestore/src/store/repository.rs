//! In-memory repository of stored nodes.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::error::{FrameError, StoreError};
use crate::store::{Filter, Node, Storable};

/// Holds frozen snapshots of stored nodes, in store order.
#[derive(Debug, Default)]
pub struct Repository {
    nodes: Vec<Node>,
    by_uuid: FxHashMap<Uuid, usize>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record: runs its `before_store` hook, freezes its node and
    /// keeps a snapshot.
    ///
    /// A failing hook leaves the record a draft and the repository unchanged.
    pub fn store<R: Storable>(&mut self, record: &mut R) -> Result<Uuid, FrameError> {
        let uuid = record.node().uuid();
        if record.node().is_stored() || self.by_uuid.contains_key(&uuid) {
            return Err(StoreError::AlreadyStored { uuid }.into());
        }
        record.before_store()?;

        let node = record.node_mut();
        node.freeze();
        self.by_uuid.insert(uuid, self.nodes.len());
        self.nodes.push(node.clone());
        log::info!("stored {} node {uuid}", node.kind());
        Ok(uuid)
    }

    /// Returns a copy of a stored node.
    pub fn load(&self, uuid: Uuid) -> Result<Node, StoreError> {
        self.get(uuid).cloned().ok_or(StoreError::NodeNotFound { uuid })
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Node> {
        self.by_uuid.get(&uuid).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Starts a query over all stored nodes.
    pub fn query(&self) -> Query<'_> {
        Query {
            repository: self,
            kinds: Vec::new(),
            filters: Vec::new(),
        }
    }
}

/// A query over stored nodes.
///
/// # Example
///
/// ```rust
/// use framestore::store::{Filter, Repository};
///
/// let repository = Repository::new();
/// let matches = repository
///     .query()
///     .filter(Filter::contains("columns", ["A"]))
///     .all();
/// assert!(matches.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Query<'a> {
    repository: &'a Repository,
    kinds: Vec<String>,
    filters: Vec<Filter>,
}

impl<'a> Query<'a> {
    /// Restricts the query to the given node kind. Repeated calls accept any
    /// of the kinds.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    /// Adds an attribute filter. All filters must match.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    fn matches(&self, node: &Node) -> bool {
        (self.kinds.is_empty() || self.kinds.iter().any(|k| k == node.kind()))
            && self.filters.iter().all(|f| f.matches(node))
    }

    /// Matching nodes, in store order.
    pub fn all(&self) -> Vec<&'a Node> {
        self.repository.nodes.iter().filter(|n| self.matches(n)).collect()
    }

    pub fn count(&self) -> usize {
        self.repository.nodes.iter().filter(|n| self.matches(n)).count()
    }

    /// The single matching node.
    pub fn one(&self) -> Result<&'a Node, StoreError> {
        match self.all().as_slice() {
            [node] => Ok(*node),
            nodes => Err(StoreError::NotExactlyOne { count: nodes.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeStore;
    use serde_json::json;

    struct Plain {
        node: Node,
        fail: bool,
        hook_runs: usize,
    }

    impl Plain {
        fn new(kind: &str) -> Self {
            Self {
                node: Node::new(kind),
                fail: false,
                hook_runs: 0,
            }
        }
    }

    impl Storable for Plain {
        fn node(&self) -> &Node {
            &self.node
        }

        fn node_mut(&mut self) -> &mut Node {
            &mut self.node
        }

        fn before_store(&mut self) -> Result<(), FrameError> {
            self.hook_runs += 1;
            if self.fail {
                return Err(FrameError::TypeMismatch("hook failed".into()));
            }
            self.node.set_attribute("checked", json!(true))?;
            Ok(())
        }
    }

    #[test]
    fn test_store_and_load() {
        let mut repository = Repository::new();
        let mut record = Plain::new("plain");
        let uuid = repository.store(&mut record).unwrap();

        assert!(record.node().is_stored());
        assert_eq!(record.hook_runs, 1);
        let loaded = repository.load(uuid).unwrap();
        assert!(loaded.is_stored());
        assert_eq!(loaded.get_attribute("checked"), Some(&json!(true)));

        let err = repository.store(&mut record).unwrap_err();
        assert!(matches!(err, FrameError::Store(StoreError::AlreadyStored { .. })));
        assert_eq!(repository.len(), 1);
    }

    #[test]
    fn test_failed_hook_stores_nothing() {
        let mut repository = Repository::new();
        let mut record = Plain::new("plain");
        record.fail = true;
        assert!(repository.store(&mut record).is_err());
        assert!(!record.node().is_stored());
        assert!(repository.is_empty());
    }

    #[test]
    fn test_query() {
        let mut repository = Repository::new();
        for (kind, len) in [("a", 3), ("a", 4), ("b", 1)] {
            let mut record = Plain::new(kind);
            record.node.set_attribute("index", json!(vec![0; len])).unwrap();
            repository.store(&mut record).unwrap();
        }

        assert_eq!(repository.query().count(), 3);
        assert_eq!(repository.query().kind("a").count(), 2);
        assert_eq!(repository.query().kind("a").kind("b").count(), 3);

        let short = repository
            .query()
            .kind("a")
            .filter(Filter::shorter_than("index", 4))
            .one()
            .unwrap();
        assert_eq!(short.get_attribute("index"), Some(&json!([0, 0, 0])));

        let err = repository.query().kind("a").one().unwrap_err();
        assert_eq!(err, StoreError::NotExactlyOne { count: 2 });
        assert!(matches!(
            repository.load(Uuid::nil()),
            Err(StoreError::NodeNotFound { .. })
        ));
    }
}
