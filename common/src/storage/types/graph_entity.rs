use crate::stored_object;

/// Exploded form of a single `GraphSnapshot` node, persisted individually so
/// it can be queried on its own and linked back to its run via `GENERATED_ENTITY`.
stored_object!(GraphEntity, "graph_entity", {
    entity_type: String,
    label: String,
    properties: serde_json::Value,
    run_id: String,
});
