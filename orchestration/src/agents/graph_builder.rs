//! GraphBuilder: assembles a [`GraphSnapshot`] from a recipe and its scaled
//! calculation. Node IDs are deterministic slugs so repeated runs over the
//! same recipe produce structurally comparable snapshots.

use common::{
    error::AppError,
    storage::types::graph_snapshot::{GraphEdge, GraphNode, GraphSnapshot},
};

use crate::contracts::GraphBuilderInput;

pub fn run(input: GraphBuilderInput) -> Result<GraphSnapshot, AppError> {
    if input.calculation.step_yields.is_empty() {
        return Err(AppError::NoOperations(
            "calculation produced no process steps to build a graph from".to_string(),
        ));
    }

    let recipe_node_id = format!("recipe:{}", input.recipe.id);
    let mut nodes = vec![GraphNode {
        id: recipe_node_id.clone(),
        node_type: "recipe".to_string(),
        label: input.recipe.name.clone(),
        properties: serde_json::json!({
            "totalPercentage": input.recipe.total_percentage,
            "yieldTarget": input.recipe.yield_target,
        }),
    }];
    let mut edges = Vec::new();

    for ingredient in &input.recipe.ingredients {
        let ingredient_node_id = format!("ingredient:{}", ingredient.id);
        nodes.push(GraphNode {
            id: ingredient_node_id.clone(),
            node_type: "ingredient".to_string(),
            label: ingredient.name.clone(),
            properties: serde_json::json!({
                "pct": ingredient.pct,
                "function": ingredient.function,
            }),
        });
        edges.push(edge(&recipe_node_id, "CONTAINS", &ingredient_node_id));
    }

    for (index, step) in input.calculation.step_yields.iter().enumerate() {
        let step_node_id = format!("step:{}", index + 1);
        nodes.push(GraphNode {
            id: step_node_id.clone(),
            node_type: "process_step".to_string(),
            label: step.step.clone(),
            properties: serde_json::json!({
                "inputMass": step.input_mass,
                "outputMass": step.output_mass,
                "yieldPct": step.yield_pct,
            }),
        });
        edges.push(edge(&recipe_node_id, "USES_PROCESS", &step_node_id));
        edges.push(edge(&step_node_id, "PRODUCES", &recipe_node_id));
    }

    let cost_node_id = format!("cost:{}", input.calculation.id);
    nodes.push(GraphNode {
        id: cost_node_id.clone(),
        node_type: "cost_annotation".to_string(),
        label: "cost breakdown".to_string(),
        properties: serde_json::to_value(input.calculation.cost_breakdown)
            .map_err(|err| AppError::InternalError(err.to_string()))?,
    });
    edges.push(edge(&recipe_node_id, "HAS_COST", &cost_node_id));

    let now = chrono::Utc::now();
    let snapshot = GraphSnapshot {
        id: format!("snapshot:{}", uuid::Uuid::new_v4()),
        created_at: now,
        updated_at: now,
        nodes,
        edges,
    };

    if !snapshot.is_internally_consistent() {
        return Err(AppError::InternalError(
            "graph builder produced an internally inconsistent snapshot".to_string(),
        ));
    }

    Ok(snapshot)
}

fn edge(source: &str, edge_type: &str, target: &str) -> GraphEdge {
    GraphEdge {
        id: format!("{source}-{edge_type}-{target}"),
        edge_type: edge_type.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        properties: serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{
        calculation_result::{CalculationResult, CostBreakdown, StepYield},
        recipe_version::{IngredientLine, RecipeVersion},
    };

    fn sample_input() -> GraphBuilderInput {
        let now = chrono::Utc::now();
        let recipe = RecipeVersion {
            id: "recipe:1".into(),
            created_at: now,
            updated_at: now,
            name: "Protein bar".into(),
            total_percentage: 100.0,
            ingredients: vec![IngredientLine {
                id: "oat_flour".into(),
                name: "Oat flour".into(),
                pct: 100.0,
                quantity: 1000.0,
                unit: "kg".into(),
                function: "base".into(),
            }],
            yield_target: 1000.0,
            yield_unit: "kg".into(),
        };
        let calculation = CalculationResult {
            id: "calc:1".into(),
            created_at: now,
            updated_at: now,
            scaling_factor: 1.0,
            batch_size: 1000.0,
            batch_unit: "kg".into(),
            scaled_ingredients: vec![],
            step_yields: vec![StepYield {
                step: "mixing".into(),
                input_mass: 1000.0,
                output_mass: 1000.0,
                byproduct_mass: 0.0,
                waste_mass: 0.0,
                yield_pct: 100.0,
            }],
            overall_yield: 100.0,
            cost_breakdown: CostBreakdown::default(),
            cost_per_unit: 0.0,
            warnings: vec![],
        };
        GraphBuilderInput { recipe, calculation }
    }

    #[test]
    fn produces_internally_consistent_snapshot() {
        let snapshot = run(sample_input()).expect("build succeeds");
        assert!(snapshot.is_internally_consistent());
        assert!(snapshot.nodes.iter().any(|n| n.node_type == "ingredient"));
        assert!(snapshot.nodes.iter().any(|n| n.node_type == "process_step"));
        assert!(snapshot.nodes.iter().any(|n| n.node_type == "cost_annotation"));
    }

    #[test]
    fn no_duplicate_edge_triples_across_runs_on_same_recipe() {
        let a = run(sample_input()).expect("build succeeds");
        let b = run(sample_input()).expect("build succeeds");
        assert_eq!(a.nodes.len(), b.nodes.len());
        let node_ids_a: Vec<&str> = a.nodes.iter().map(|n| n.id.as_str()).collect();
        let node_ids_b: Vec<&str> = b.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids_a, node_ids_b);
    }
}
