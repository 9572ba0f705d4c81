use serde::{Deserialize, Serialize};

use crate::stored_object;

stored_object!(Formulation, "formulation", {
    name: String,
    status: String,
    cost_metadata: serde_json::Value,
});
