//! QAValidator: runs the fixed check list over the upstream artifacts and
//! folds the results into an overall status. Each check is an independent
//! pure function; aggregation never special-cases a particular check.

use common::{
    error::AppError,
    storage::types::{
        recipe_version::PERCENTAGE_TOLERANCE,
        validation_report::{CheckResult, CheckSeverity, ValidationReport},
    },
};

use crate::contracts::QaValidatorInput;

/// Units allowed on a scaled ingredient line.
const ALLOWED_UNITS: [&str; 12] = [
    "kg", "g", "lb", "oz", "mg", "t", "l", "ml", "gal", "fl_oz", "kl", "pcs",
];
const ALLOWED_UNITS_EXTRA: [&str; 2] = ["units", "ea"];
const MASS_BALANCE_TOLERANCE: f64 = 0.01;

pub fn run(input: QaValidatorInput) -> Result<ValidationReport, AppError> {
    let mut checks = Vec::new();

    checks.push(check_percentages_sum(&input));
    checks.push(check_quantities_positive(&input));
    checks.push(check_units_allowed(&input));
    let mass_balance_ok = input.calculation.mass_balance_ok(MASS_BALANCE_TOLERANCE);
    checks.push(check_mass_balance(&input, mass_balance_ok));
    checks.push(check_yield(&input));
    checks.push(check_decimal_precision(&input));

    let overall_status = ValidationReport::derive_overall_status(&checks);
    let yield_ok = input.calculation.overall_yield_in_range();

    let now = chrono::Utc::now();
    Ok(ValidationReport {
        id: format!("report:{}", uuid::Uuid::new_v4()),
        created_at: now,
        updated_at: now,
        overall_status,
        checks,
        mass_balance_ok,
        yield_ok,
    })
}

fn check_percentages_sum(input: &QaValidatorInput) -> CheckResult {
    let error = input.recipe.percentage_error();
    let passed = error <= PERCENTAGE_TOLERANCE;
    CheckResult {
        name: "percentages_sum_to_100".to_string(),
        severity: if passed { CheckSeverity::Info } else { CheckSeverity::Error },
        passed,
        detail: format!("percentage error {error:.3} (tolerance {PERCENTAGE_TOLERANCE})"),
    }
}

fn check_quantities_positive(input: &QaValidatorInput) -> CheckResult {
    let negative = input
        .calculation
        .scaled_ingredients
        .iter()
        .filter(|i| i.quantity <= 0.0)
        .count();
    let passed = negative == 0;
    CheckResult {
        name: "quantities_positive".to_string(),
        severity: if passed { CheckSeverity::Info } else { CheckSeverity::Error },
        passed,
        detail: format!("{negative} ingredient(s) with non-positive quantity"),
    }
}

fn check_units_allowed(input: &QaValidatorInput) -> CheckResult {
    let disallowed: Vec<&str> = input
        .calculation
        .scaled_ingredients
        .iter()
        .map(|i| i.unit.as_str())
        .filter(|unit| {
            let lower = unit.to_lowercase();
            !ALLOWED_UNITS.contains(&lower.as_str()) && !ALLOWED_UNITS_EXTRA.contains(&lower.as_str())
                && lower != "dozen"
        })
        .collect();
    let passed = disallowed.is_empty();
    CheckResult {
        name: "units_allowed".to_string(),
        severity: if passed { CheckSeverity::Info } else { CheckSeverity::Error },
        passed,
        detail: if passed {
            "all units in the allowed set".to_string()
        } else {
            format!("disallowed units: {}", disallowed.join(", "))
        },
    }
}

fn check_mass_balance(_input: &QaValidatorInput, mass_balance_ok: bool) -> CheckResult {
    CheckResult {
        name: "mass_balance".to_string(),
        severity: if mass_balance_ok { CheckSeverity::Info } else { CheckSeverity::Error },
        passed: mass_balance_ok,
        detail: format!("within tolerance {MASS_BALANCE_TOLERANCE}: {mass_balance_ok}"),
    }
}

fn check_yield(input: &QaValidatorInput) -> CheckResult {
    let yield_pct = input.calculation.overall_yield;
    let severity = if yield_pct < 60.0 {
        CheckSeverity::Error
    } else if yield_pct < 80.0 {
        CheckSeverity::Warn
    } else {
        CheckSeverity::Info
    };
    CheckResult {
        name: "yield_thresholds".to_string(),
        severity,
        passed: !matches!(severity, CheckSeverity::Error),
        detail: format!("overall yield {yield_pct:.2}%"),
    }
}

fn check_decimal_precision(input: &QaValidatorInput) -> CheckResult {
    let imprecise = input
        .calculation
        .scaled_ingredients
        .iter()
        .filter(|i| decimal_places(i.quantity) > 3)
        .count();
    let passed = imprecise == 0;
    CheckResult {
        name: "decimal_precision".to_string(),
        severity: if passed { CheckSeverity::Info } else { CheckSeverity::Warn },
        passed,
        detail: format!("{imprecise} ingredient(s) beyond 3 decimal places"),
    }
}

fn decimal_places(value: f64) -> u32 {
    let rounded3 = (value * 1000.0).round() / 1000.0;
    for places in 0..=3 {
        let factor = 10f64.powi(places);
        if ((rounded3 * factor).round() / factor - rounded3).abs() < 1e-9 {
            return places as u32;
        }
    }
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::{
        calculation_result::{CalculationResult, CostBreakdown, ScaledIngredient, StepYield},
        graph_snapshot::GraphSnapshot,
        recipe_version::{IngredientLine, RecipeVersion},
    };

    fn sample_input(yield_pct: f64, balance_off_by: f64) -> QaValidatorInput {
        let now = chrono::Utc::now();
        let recipe = RecipeVersion {
            id: "recipe:1".into(),
            created_at: now,
            updated_at: now,
            name: "bar".into(),
            total_percentage: 100.0,
            ingredients: vec![IngredientLine {
                id: "oat_flour".into(),
                name: "oat flour".into(),
                pct: 100.0,
                quantity: 1.0,
                unit: "kg".into(),
                function: "base".into(),
            }],
            yield_target: 1.0,
            yield_unit: "kg".into(),
        };
        let calculation = CalculationResult {
            id: "calc:1".into(),
            created_at: now,
            updated_at: now,
            scaling_factor: 1.0,
            batch_size: 1.0,
            batch_unit: "kg".into(),
            scaled_ingredients: vec![ScaledIngredient {
                id: "oat_flour".into(),
                name: "oat flour".into(),
                quantity: 1.0,
                unit: "kg".into(),
            }],
            step_yields: vec![StepYield {
                step: "mixing".into(),
                input_mass: 1.0,
                output_mass: 1.0 - balance_off_by,
                byproduct_mass: 0.0,
                waste_mass: 0.0,
                yield_pct,
            }],
            overall_yield: yield_pct,
            cost_breakdown: CostBreakdown::default(),
            cost_per_unit: 0.0,
            warnings: vec![],
        };
        let graph = GraphSnapshot {
            id: "snap:1".into(),
            created_at: now,
            updated_at: now,
            nodes: vec![],
            edges: vec![],
        };
        QaValidatorInput { recipe, calculation, graph }
    }

    #[test]
    fn all_checks_pass_yields_pass_status() {
        let report = run(sample_input(100.0, 0.0)).expect("validates");
        assert_eq!(report.overall_status, common::storage::types::validation_report::OverallStatus::Pass);
    }

    #[test]
    fn mass_balance_off_by_point_zero_five_on_one_kg_batch_fails() {
        let report = run(sample_input(94.0, 0.05)).expect("validates");
        assert!(!report.mass_balance_ok);
        assert_eq!(report.overall_status, common::storage::types::validation_report::OverallStatus::Fail);
    }

    #[test]
    fn yield_below_eighty_warns_below_sixty_fails() {
        let warn_report = run(sample_input(75.0, 0.0)).expect("validates");
        assert_eq!(warn_report.overall_status, common::storage::types::validation_report::OverallStatus::Warn);

        let fail_report = run(sample_input(55.0, 0.0)).expect("validates");
        assert_eq!(fail_report.overall_status, common::storage::types::validation_report::OverallStatus::Fail);
    }
}
