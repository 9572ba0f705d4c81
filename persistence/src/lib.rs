//! Writes [`orchestration::pipeline::OrchestrationResult`]s and nutrition
//! labels to the graph store in single atomic transactions, and reads them
//! back for the history/detail endpoints. Generalizes the teacher's
//! `stages::persist` (MERGE artifact + RELATE provenance edges inside one
//! `BEGIN/COMMIT TRANSACTION`) to the five formulation artifacts plus the
//! exploded `GraphEntity` rows.

pub mod history;
pub mod nutrition_label;
pub mod run_persistence;

pub use history::{ListRunsParams, RunDetail, RunHistoryService, RunSummary};
pub use nutrition_label::NutritionLabelService;
pub use run_persistence::{persist, PersistedRunIds};
