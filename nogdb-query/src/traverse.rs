//! Walk (single-hop incident-edge listing) and BFS/DFS traversal over a
//! [`GraphReader`], bounded by depth and scoped by [`GraphFilter`].

use crate::filter::GraphFilter;
use crate::record::{DecodedRecord, GraphReader};
use nogdb_api::{RecordId, Result};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Bfs,
    Dfs,
}

/// Returns the incident edges of `vertex` in `direction`, decoded, filtered
/// by `filter`'s class scope and condition/predicate.
pub fn walk_edges<R: GraphReader>(
    reader: &R,
    vertex: RecordId,
    direction: Direction,
    filter: &GraphFilter,
) -> Result<Vec<DecodedRecord>> {
    let pairs = match direction {
        Direction::Out => reader.out_edges(vertex)?,
        Direction::In => reader.in_edges(vertex)?,
        Direction::All => {
            let mut v = reader.out_edges(vertex)?;
            v.extend(reader.in_edges(vertex)?);
            v
        }
    };
    let mut out = Vec::new();
    for (edge, _neighbor) in pairs {
        let class_name = reader.class_name_of(edge.class_id)?;
        if !filter.allows_class(&class_name) {
            continue;
        }
        let record = reader.fetch_decoded(edge)?;
        let types = reader.property_types(edge.class_id)?;
        if filter.matches(&record, &types)? {
            out.push(record);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct TraversalSpec {
    pub direction: Direction,
    pub strategy: Strategy,
    pub min_depth: u32,
    pub max_depth: u32,
    pub edge_filter: GraphFilter,
    pub vertex_filter: GraphFilter,
}

impl Default for TraversalSpec {
    fn default() -> Self {
        TraversalSpec {
            direction: Direction::Out,
            strategy: Strategy::Bfs,
            min_depth: 0,
            max_depth: u32::MAX,
            edge_filter: GraphFilter::new(),
            vertex_filter: GraphFilter::new(),
        }
    }
}

/// Walks from one or more source vertices, following edges in `direction`,
/// visiting each vertex at most once (pruned at arrival, so both BFS and
/// DFS agree on which vertices are ever visited — they differ only in
/// order and in which duplicate path reaches a vertex first).
///
/// `min_depth` filters the *output*: vertices below it are still expanded.
/// `max_depth` halts expansion strictly: a vertex at exactly `max_depth`
/// is returned (if it clears `min_depth`) but never expanded further.
pub fn traverse<R: GraphReader>(
    reader: &R,
    sources: &[RecordId],
    spec: &TraversalSpec,
) -> Result<Vec<DecodedRecord>> {
    let mut visited: HashSet<RecordId> = HashSet::new();
    let mut output = Vec::new();
    let mut frontier: VecDeque<(RecordId, u32)> = sources.iter().map(|&s| (s, 0)).collect();

    loop {
        let next = match spec.strategy {
            Strategy::Bfs => frontier.pop_front(),
            Strategy::Dfs => frontier.pop_back(),
        };
        let Some((vertex, depth)) = next else {
            break;
        };
        if !visited.insert(vertex) {
            continue;
        }

        let mut record = reader.fetch_decoded(vertex)?;
        record.depth = depth;
        if depth >= spec.min_depth {
            let types = reader.property_types(vertex.class_id)?;
            if spec.vertex_filter.matches(&record, &types)? {
                output.push(record);
            }
        }

        if depth >= spec.max_depth {
            continue;
        }

        let neighbors = match spec.direction {
            Direction::Out => reader.out_edges(vertex)?,
            Direction::In => reader.in_edges(vertex)?,
            Direction::All => {
                let mut v = reader.out_edges(vertex)?;
                v.extend(reader.in_edges(vertex)?);
                v
            }
        };
        for (edge, neighbor) in neighbors {
            if visited.contains(&neighbor) {
                continue;
            }
            let edge_class = reader.class_name_of(edge.class_id)?;
            if !spec.edge_filter.allows_class(&edge_class) {
                continue;
            }
            if spec.edge_filter.filter.is_some() {
                let edge_record = reader.fetch_decoded(edge)?;
                let edge_types = reader.property_types(edge.class_id)?;
                if !spec.edge_filter.matches(&edge_record, &edge_types)? {
                    continue;
                }
            }
            frontier.push_back((neighbor, depth + 1));
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::PropertyTypeMap;
    use nogdb_api::{ClassId, PropertyType};
    use std::collections::HashMap;

    /// A tiny in-memory graph reader for exercising traversal without the
    /// storage/facade layers: class 1 = vertex, class 2 = edge.
    struct FakeGraph {
        out: HashMap<RecordId, Vec<(RecordId, RecordId)>>,
        in_: HashMap<RecordId, Vec<(RecordId, RecordId)>>,
    }

    impl GraphReader for FakeGraph {
        fn fetch_decoded(&self, rid: RecordId) -> Result<DecodedRecord> {
            let mut r = DecodedRecord::new();
            r.record_id = rid;
            r.class_name = self.class_name_of(rid.class_id)?;
            Ok(r)
        }
        fn class_name_of(&self, class_id: ClassId) -> Result<String> {
            Ok(if class_id == 1 { "island".into() } else { "bridge".into() })
        }
        fn out_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
            Ok(self.out.get(&vertex).cloned().unwrap_or_default())
        }
        fn in_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
            Ok(self.in_.get(&vertex).cloned().unwrap_or_default())
        }
        fn property_types(&self, _class_id: ClassId) -> Result<PropertyTypeMap> {
            Ok(PropertyTypeMap::new())
        }
    }

    fn v(id: u32) -> RecordId {
        RecordId::new(1, id)
    }
    fn e(id: u32) -> RecordId {
        RecordId::new(2, id)
    }

    fn chain_graph() -> FakeGraph {
        // v1 -> v2 -> v3 -> v4
        let mut out = HashMap::new();
        let mut in_ = HashMap::new();
        out.insert(v(1), vec![(e(1), v(2))]);
        out.insert(v(2), vec![(e(2), v(3))]);
        out.insert(v(3), vec![(e(3), v(4))]);
        in_.insert(v(2), vec![(e(1), v(1))]);
        in_.insert(v(3), vec![(e(2), v(2))]);
        in_.insert(v(4), vec![(e(3), v(3))]);
        FakeGraph { out, in_ }
    }

    #[test]
    fn bfs_visits_in_nondecreasing_depth_order() {
        let g = chain_graph();
        let spec = TraversalSpec::default();
        let result = traverse(&g, &[v(1)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        let depths: Vec<u32> = result.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 3]);
    }

    #[test]
    fn max_depth_halts_expansion() {
        let g = chain_graph();
        let spec = TraversalSpec {
            max_depth: 1,
            ..TraversalSpec::default()
        };
        let result = traverse(&g, &[v(1)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn min_depth_filters_output_but_still_expands() {
        let g = chain_graph();
        let spec = TraversalSpec {
            min_depth: 2,
            ..TraversalSpec::default()
        };
        let result = traverse(&g, &[v(1)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn in_direction_walks_predecessors() {
        let g = chain_graph();
        let spec = TraversalSpec {
            direction: Direction::In,
            ..TraversalSpec::default()
        };
        let result = traverse(&g, &[v(4)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn dfs_visits_each_vertex_at_most_once_on_a_diamond() {
        // v1 -> v2 -> v4, v1 -> v3 -> v4
        let mut out = HashMap::new();
        out.insert(v(1), vec![(e(1), v(2)), (e(2), v(3))]);
        out.insert(v(2), vec![(e(3), v(4))]);
        out.insert(v(3), vec![(e(4), v(4))]);
        let g = FakeGraph { out, in_: HashMap::new() };
        let spec = TraversalSpec {
            strategy: Strategy::Dfs,
            ..TraversalSpec::default()
        };
        let result = traverse(&g, &[v(1)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids.iter().filter(|&&id| id == 4).count(), 1);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn edge_class_whitelist_prunes_expansion() {
        let g = chain_graph();
        let spec = TraversalSpec {
            edge_filter: GraphFilter::new().only_classes(["nonexistent".to_string()]),
            ..TraversalSpec::default()
        };
        let result = traverse(&g, &[v(1)], &spec).unwrap();
        let ids: Vec<u32> = result.iter().map(|r| r.record_id.position_id).collect();
        assert_eq!(ids, vec![1]);
    }
}
