//! Loads the structured side of a retrieval: `GraphEntity` rows plus their
//! one-hop `entity_relationship` edges, capped to `structured_limit`.

use common::{
    error::AppError,
    storage::{db::GraphStore, types::graph_entity::GraphEntity},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipSummary {
    pub source: String,
    pub target: String,
    pub edge_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityWithRelationships {
    pub id: String,
    pub entity_type: String,
    pub label: String,
    pub properties: serde_json::Value,
    pub relationships: Vec<RelationshipSummary>,
}

#[derive(Debug, Deserialize)]
struct RelationshipRow {
    source: String,
    target: String,
    edge_type: String,
}

/// Loads up to `structured_limit` entities by id, each annotated with its
/// one-hop relationships (also capped to `structured_limit` total edges).
pub async fn load_entities_with_relationships(
    store: &GraphStore,
    entity_ids: &[String],
    structured_limit: usize,
) -> Result<Vec<EntityWithRelationships>, AppError> {
    if entity_ids.is_empty() || structured_limit == 0 {
        return Ok(Vec::new());
    }

    let capped_ids: Vec<String> = entity_ids.iter().take(structured_limit).cloned().collect();

    let entities: Vec<GraphEntity> = store
        .run_read(
            "SELECT * FROM graph_entity \
             WHERE id IN $ids.map(|$v| type::thing('graph_entity', $v)) LIMIT $limit;",
            vec![
                ("ids", capped_ids.clone().into()),
                ("limit", i64::try_from(structured_limit).unwrap_or(i64::MAX).into()),
            ],
        )
        .await?;

    let relationships: Vec<RelationshipRow> = store
        .run_read(
            "SELECT source, target, edge_type FROM entity_relationship \
             WHERE source IN $ids OR target IN $ids LIMIT $limit;",
            vec![
                ("ids", capped_ids.into()),
                ("limit", i64::try_from(structured_limit).unwrap_or(i64::MAX).into()),
            ],
        )
        .await?;

    Ok(entities
        .into_iter()
        .map(|entity| {
            let relationships = relationships
                .iter()
                .filter(|rel| rel.source == entity.id || rel.target == entity.id)
                .map(|rel| RelationshipSummary {
                    source: rel.source.clone(),
                    target: rel.target.clone(),
                    edge_type: rel.edge_type.clone(),
                })
                .collect();
            EntityWithRelationships {
                id: entity.id,
                entity_type: entity.entity_type,
                label: entity.label,
                properties: entity.properties,
                relationships,
            }
        })
        .collect())
}
