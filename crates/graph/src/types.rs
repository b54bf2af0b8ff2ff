use serde::{Deserialize, Serialize};

/// Named, addressable code construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEntity {
    /// `path`, `path#name` or `path#Class.method`
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    pub file_path: String,

    /// 1-indexed; synthetic external modules use 0
    pub start_line: usize,
    pub end_line: usize,

    /// First source line of the declaration, trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Chunk this entity was extracted alongside
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}

impl GraphEntity {
    /// Module entity standing in for an import target outside the file set
    pub fn external_module(specifier: &str) -> Self {
        Self {
            id: specifier.to_string(),
            name: specifier.to_string(),
            entity_type: EntityType::Module,
            file_path: specifier.to_string(),
            start_line: 0,
            end_line: 0,
            signature: None,
            chunk_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Module,
    Function,
    Method,
    Class,
    Interface,
    Type,
}

/// Typed directed edge between entity ids (targets may be best-effort names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRelation {
    pub source_id: String,
    pub target_id: String,

    #[serde(rename = "type")]
    pub relation_type: RelationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GraphRelation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Contains,
    Imports,
    Exports,
    Calls,
    Extends,
    Implements,
}

impl RelationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Imports => "IMPORTS",
            Self::Exports => "EXPORTS",
            Self::Calls => "CALLS",
            Self::Extends => "EXTENDS",
            Self::Implements => "IMPLEMENTS",
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entities and relations of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub entities: Vec<GraphEntity>,
    pub relations: Vec<GraphRelation>,
}

impl ExtractionResult {
    /// Result holding only the file's module entity
    pub fn module_only(module: GraphEntity) -> Self {
        Self {
            entities: vec![module],
            relations: Vec::new(),
        }
    }

    /// The file's module entity, always first
    pub fn module(&self) -> Option<&GraphEntity> {
        self.entities.first()
    }

    /// Relations of one type, in extraction order
    pub fn relations_of(&self, relation_type: RelationType) -> impl Iterator<Item = &GraphRelation> {
        self.relations
            .iter()
            .filter(move |relation| relation.relation_type == relation_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_with_wire_names() {
        let relation = GraphRelation::new("a.ts", "a.ts#Foo", RelationType::Contains);
        let json = serde_json::to_value(&relation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sourceId": "a.ts", "targetId": "a.ts#Foo", "type": "CONTAINS"})
        );

        let entity = GraphEntity::external_module("react");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "module");
        assert_eq!(json["filePath"], "react");
        assert_eq!(json["startLine"], 0);
        assert!(json.get("chunkId").is_none());
    }
}
