//! RecipeEngineer: turns a request into a balanced [`RecipeVersion`].
//!
//! The request text is parsed deterministically first (the common case: a
//! request already spells out "N% ingredient" pairs); only when no such
//! pairs are found is the LLM client consulted to propose an ingredient
//! list. Either way, the resulting percentages are re-validated the same
//! way — the model's own arithmetic is never trusted.

use common::{
    clients::llm::{CompletionParams, LlmClient},
    error::AppError,
    storage::types::recipe_version::{IngredientLine, RecipeVersion, MAX_INGREDIENTS, PERCENTAGE_TOLERANCE},
};

use crate::contracts::RecipeEngineerInput;

const STRUCTURED_PROMPT_PREAMBLE: &str = "Extract a food formulation ingredient list from the \
following request. Respond with a JSON array of objects shaped like \
{\"name\": string, \"pct\": number, \"function\": string}. Percentages must sum to 100. \
Request: ";

pub async fn run(llm: &LlmClient, input: RecipeEngineerInput) -> Result<RecipeVersion, AppError> {
    let lines = match parse_structured(&input.user_request) {
        Some(lines) => lines,
        None => parse_via_llm(llm, &input.user_request).await?,
    };

    build_recipe(&input.user_request, lines)
}

/// Parses "`N`% `ingredient name`" pairs out of free text, separated by commas
/// or " and ". Returns `None` when no such pair is found, signaling the
/// caller to fall back to the LLM path.
fn parse_structured(text: &str) -> Option<Vec<IngredientLine>> {
    let mut lines = Vec::new();

    for clause in text.split(',').flat_map(|part| part.split(" and ")) {
        let clause = clause.trim();
        let Some(percent_idx) = clause.find('%') else {
            continue;
        };
        let (number_part, name_part) = clause.split_at(percent_idx);
        let name_part = name_part.strip_prefix('%').unwrap_or(name_part).trim();

        let number_str: String = number_part
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect::<String>()
            .chars()
            .rev()
            .collect();

        let (Ok(pct), false) = (number_str.parse::<f64>(), name_part.is_empty()) else {
            continue;
        };

        let slug = slugify(name_part);
        lines.push(IngredientLine {
            id: slug,
            name: name_part.to_string(),
            pct,
            quantity: 0.0,
            unit: "kg".to_string(),
            function: "other".to_string(),
        });
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}

async fn parse_via_llm(llm: &LlmClient, user_request: &str) -> Result<Vec<IngredientLine>, AppError> {
    let prompt = format!("{STRUCTURED_PROMPT_PREAMBLE}{user_request}");
    let raw = llm.complete(&prompt, CompletionParams::default()).await?;

    #[derive(serde::Deserialize)]
    struct ProposedIngredient {
        name: String,
        pct: f64,
        #[serde(default)]
        function: Option<String>,
    }

    let proposed: Vec<ProposedIngredient> = serde_json::from_str(&raw)
        .map_err(|err| AppError::LLMParsing(format!("could not parse ingredient list: {err}")))?;

    Ok(proposed
        .into_iter()
        .map(|p| IngredientLine {
            id: slugify(&p.name),
            name: p.name,
            pct: p.pct,
            quantity: 0.0,
            unit: "kg".to_string(),
            function: p.function.unwrap_or_else(|| "other".to_string()),
        })
        .collect())
}

fn build_recipe(user_request: &str, ingredients: Vec<IngredientLine>) -> Result<RecipeVersion, AppError> {
    if ingredients.is_empty() {
        return Err(AppError::NoLineItems("no ingredients were parsed from the request".into()));
    }
    if ingredients.len() > MAX_INGREDIENTS {
        return Err(AppError::Validation(format!(
            "recipe has {} ingredients, exceeding the cap of {MAX_INGREDIENTS}",
            ingredients.len()
        )));
    }

    let total_percentage: f64 = ingredients.iter().map(|i| i.pct).sum();
    if (total_percentage - 100.0).abs() > PERCENTAGE_TOLERANCE {
        return Err(AppError::PercentageMismatch(format!(
            "ingredient percentages sum to {total_percentage:.2}%, expected 100% +/- {PERCENTAGE_TOLERANCE}%"
        )));
    }

    let now = chrono::Utc::now();
    Ok(RecipeVersion {
        id: format!("recipe:{}", uuid::Uuid::new_v4()),
        created_at: now,
        updated_at: now,
        name: derive_name(user_request),
        total_percentage,
        ingredients,
        // Percentages are always relative to a 100-unit reference batch, the
        // standard F&B formulation basis ("20g protein per 100g"). This is
        // the basis ScalingCalculator scales against, not a literal yield.
        yield_target: 100.0,
        yield_unit: "kg".to_string(),
    })
}

fn derive_name(user_request: &str) -> String {
    let trimmed = user_request.trim();
    if trimmed.len() <= 80 {
        trimmed.to_string()
    } else {
        // Safe on UTF-8 boundaries: ASCII request text is the common case,
        // and we fall back to the full string when a char boundary would split.
        trimmed.get(..80).unwrap_or(trimmed).to_string()
    }
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percent_pairs_from_structured_text() {
        let lines = parse_structured("Create a protein bar with 85% oat flour and 15% whey")
            .expect("should parse structured pairs");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "oat flour");
        assert_eq!(lines[0].pct, 85.0);
        assert_eq!(lines[1].name, "whey");
        assert_eq!(lines[1].pct, 15.0);
    }

    #[test]
    fn returns_none_for_fully_unstructured_text() {
        assert!(parse_structured("make me something tasty and high protein").is_none());
    }

    #[test]
    fn balanced_request_builds_recipe() {
        let input = RecipeEngineerInput {
            user_request: "Create a protein bar with 85% oat flour and 15% whey".to_string(),
        };
        let lines = parse_structured(&input.user_request).expect("parses");
        let recipe = build_recipe(&input.user_request, lines).expect("builds");
        assert!(recipe.percentages_balanced());
        assert_eq!(recipe.ingredients.len(), 2);
    }

    #[test]
    fn mismatched_percentages_fail_with_percentage_mismatch() {
        let input = RecipeEngineerInput {
            user_request: "Create a bar with 80% oat flour and 18.5% whey".to_string(),
        };
        let lines = parse_structured(&input.user_request).expect("parses");
        let err = build_recipe(&input.user_request, lines).expect_err("should fail");
        assert_eq!(err.code(), "PERCENTAGE_MISMATCH");
        assert!(err.to_string().contains("98.50"));
    }

    #[test]
    fn too_many_ingredients_fails_validation() {
        let lines: Vec<IngredientLine> = (0..21)
            .map(|i| IngredientLine {
                id: format!("ing_{i}"),
                name: format!("ingredient {i}"),
                pct: 100.0 / 21.0,
                quantity: 0.0,
                unit: "kg".into(),
                function: "other".into(),
            })
            .collect();
        let err = build_recipe("too many", lines).expect_err("should fail");
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
