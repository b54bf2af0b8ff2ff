use crate::error::{GraphError, Result};
use crate::types::{ExtractionResult, GraphEntity, RelationType};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Node in the code graph
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,

    /// `None` for a relation target no ingested file has declared
    pub entity: Option<GraphEntity>,

    /// File whose extraction declared this node
    owner: Option<String>,
}

/// Cross-file graph folded together from per-file extraction results
#[derive(Debug, Default)]
pub struct CodeGraph {
    graph: StableDiGraph<GraphNode, RelationType>,

    /// Entity id -> node
    index: HashMap<String, NodeIndex>,

    /// File path -> nodes it declared
    file_nodes: HashMap<String, Vec<NodeIndex>>,

    /// File path -> edges its extraction produced
    file_edges: HashMap<String, Vec<EdgeIndex>>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file's extraction in, replacing what that file contributed
    /// before. Dangling relation targets become placeholder nodes.
    pub fn ingest(&mut self, result: ExtractionResult) {
        let Some(file) = result.module().map(|module| module.file_path.clone()) else {
            return;
        };
        self.remove_file(&file);

        let mut declared = Vec::new();
        for entity in result.entities {
            let owned = entity.file_path == file;
            let idx = self.upsert(entity, owned.then(|| file.clone()));
            if owned {
                declared.push(idx);
            }
        }

        let mut edges = Vec::with_capacity(result.relations.len());
        for relation in result.relations {
            let source = self.ensure(&relation.source_id);
            let target = self.ensure(&relation.target_id);
            edges.push(self.graph.add_edge(source, target, relation.relation_type));
        }

        log::debug!(
            "Ingested {file}: {} nodes, {} edges in graph",
            self.node_count(),
            self.edge_count()
        );
        self.file_nodes.insert(file.clone(), declared);
        self.file_edges.insert(file, edges);
    }

    /// Drop everything `file` contributed. Declared nodes that other files
    /// still point at are kept as placeholders. Returns whether the file was known.
    pub fn remove_file(&mut self, file: &str) -> bool {
        let edges = self.file_edges.remove(file);
        let nodes = self.file_nodes.remove(file);
        if edges.is_none() && nodes.is_none() {
            return false;
        }

        let mut touched = Vec::new();
        for edge in edges.unwrap_or_default() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                touched.push(source);
                touched.push(target);
            }
            self.graph.remove_edge(edge);
        }

        for idx in nodes.unwrap_or_default() {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                node.entity = None;
                node.owner = None;
            }
            touched.push(idx);
        }

        for idx in touched {
            self.prune(idx);
        }
        true
    }

    /// Declared entity by id
    pub fn entity(&self, id: &str) -> Option<&GraphEntity> {
        self.index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(|node| node.entity.as_ref())
    }

    /// Targets of `CALLS` edges from `id`
    pub fn callees(&self, id: &str) -> Result<Vec<&str>> {
        self.neighbors(id, RelationType::Calls, Direction::Outgoing)
    }

    /// Sources of `CALLS` edges into `id`
    pub fn callers(&self, id: &str) -> Result<Vec<&str>> {
        self.neighbors(id, RelationType::Calls, Direction::Incoming)
    }

    /// Targets of `CONTAINS` edges from `id`
    pub fn children(&self, id: &str) -> Result<Vec<&str>> {
        self.neighbors(id, RelationType::Contains, Direction::Outgoing)
    }

    /// Ids referenced by relations but never declared, sorted
    pub fn unresolved_targets(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
            .filter(|node| node.entity.is_none())
            .map(|node| node.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn neighbors(
        &self,
        id: &str,
        relation_type: RelationType,
        direction: Direction,
    ) -> Result<Vec<&str>> {
        let &idx = self
            .index
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut ids: Vec<&str> = self
            .graph
            .edges_directed(idx, direction)
            .filter(|edge| *edge.weight() == relation_type)
            .map(|edge| match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
            .filter_map(|other| self.graph.node_weight(other))
            .map(|node| node.id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn upsert(&mut self, entity: GraphEntity, owner: Option<String>) -> NodeIndex {
        if let Some(&idx) = self.index.get(&entity.id) {
            if let Some(node) = self.graph.node_weight_mut(idx) {
                // Shared nodes (external modules) never displace a declaration.
                if owner.is_some() || node.entity.is_none() {
                    node.entity = Some(entity);
                    if owner.is_some() {
                        node.owner = owner;
                    }
                }
            }
            return idx;
        }

        let id = entity.id.clone();
        let idx = self.graph.add_node(GraphNode {
            id: id.clone(),
            entity: Some(entity),
            owner,
        });
        self.index.insert(id, idx);
        idx
    }

    fn ensure(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.to_string(),
            entity: None,
            owner: None,
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Remove `idx` if no file owns it and nothing connects to it.
    fn prune(&mut self, idx: NodeIndex) {
        let Some(node) = self.graph.node_weight(idx) else {
            return;
        };
        if node.owner.is_some() || self.graph.neighbors_undirected(idx).next().is_some() {
            return;
        }
        if let Some(node) = self.graph.remove_node(idx) {
            self.index.remove(&node.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityType, GraphRelation};
    use pretty_assertions::assert_eq;

    fn entity(id: &str, file: &str, entity_type: EntityType) -> GraphEntity {
        GraphEntity {
            id: id.to_string(),
            name: id.rsplit('#').next().unwrap_or(id).to_string(),
            entity_type,
            file_path: file.to_string(),
            start_line: 1,
            end_line: 1,
            signature: None,
            chunk_id: None,
        }
    }

    fn file_a() -> ExtractionResult {
        ExtractionResult {
            entities: vec![
                entity("a.ts", "a.ts", EntityType::Module),
                entity("react", "react", EntityType::Module),
                entity("a.ts#run", "a.ts", EntityType::Function),
            ],
            relations: vec![
                GraphRelation::new("a.ts", "react", RelationType::Imports),
                GraphRelation::new("a.ts", "a.ts#run", RelationType::Contains),
                GraphRelation::new("a.ts#run", "helper", RelationType::Calls),
            ],
        }
    }

    #[test]
    fn ingest_creates_placeholders_for_dangling_targets() {
        let mut graph = CodeGraph::new();
        graph.ingest(file_a());

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.unresolved_targets(), vec!["helper"]);
        assert_eq!(graph.callees("a.ts#run").unwrap(), vec!["helper"]);
        assert_eq!(graph.callers("helper").unwrap(), vec!["a.ts#run"]);
        assert_eq!(graph.children("a.ts").unwrap(), vec!["a.ts#run"]);
        assert_eq!(
            graph.entity("a.ts#run").map(|e| e.entity_type),
            Some(EntityType::Function)
        );
        assert!(matches!(
            graph.callees("missing"),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn reingest_replaces_file_contribution() {
        let mut graph = CodeGraph::new();
        graph.ingest(file_a());
        graph.ingest(file_a());

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn remove_file_keeps_nodes_other_files_reference() {
        let mut graph = CodeGraph::new();
        graph.ingest(file_a());
        graph.ingest(ExtractionResult {
            entities: vec![entity("b.ts", "b.ts", EntityType::Module)],
            relations: vec![GraphRelation::new("b.ts", "a.ts#run", RelationType::Calls)],
        });

        assert!(graph.remove_file("a.ts"));
        assert!(!graph.remove_file("a.ts"));

        // b.ts still calls a.ts#run, which is now undeclared
        assert_eq!(graph.entity("a.ts#run"), None);
        assert_eq!(graph.unresolved_targets(), vec!["a.ts#run"]);
        assert_eq!(graph.callers("a.ts#run").unwrap(), vec!["b.ts"]);
        assert!(graph.entity("react").is_none());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }
}
