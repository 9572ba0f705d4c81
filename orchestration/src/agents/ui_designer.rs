//! UIDesigner: emits a UI presentation config describing layout, theme,
//! component inventory, and accessibility metadata. No binary assets —
//! everything here is small JSON, keeping total output well under 60 KB.

use std::collections::HashMap;

use common::{
    error::AppError,
    storage::types::ui_config::{
        Accessibility, Breakpoint, ComponentSpec, Layout, Theme, UIConfig, WCAG_AA_MIN_CONTRAST,
    },
};

use crate::contracts::UiDesignerInput;

/// Neutral, brand-free default palette (foreground, background) as hex.
const DEFAULT_FOREGROUND: &str = "#1a1a1a";
const DEFAULT_BACKGROUND: &str = "#ffffff";

pub fn run(input: UiDesignerInput) -> Result<UIConfig, AppError> {
    let contrast = contrast_ratio(DEFAULT_FOREGROUND, DEFAULT_BACKGROUND)
        .ok_or_else(|| AppError::InternalError("default palette colors failed to parse".to_string()))?;

    let mut sections = vec!["ingredients".to_string()];
    let mut components = vec![ComponentSpec {
        id: "ingredients_table".to_string(),
        component_type: "table".to_string(),
        variant: "default".to_string(),
        props: serde_json::json!({ "rows": input.recipe.ingredients.len() }),
    }];

    if input.calculation.cost_breakdown.total() > 0.0 {
        sections.push("cost".to_string());
        components.push(ComponentSpec {
            id: "cost_panel".to_string(),
            component_type: "panel".to_string(),
            variant: "cost_breakdown".to_string(),
            props: serde_json::json!({ "costPerUnit": input.calculation.cost_per_unit }),
        });
    }

    if input.calculation.overall_yield < 100.0 {
        sections.push("yield".to_string());
        components.push(ComponentSpec {
            id: "yield_gauge".to_string(),
            component_type: "gauge".to_string(),
            variant: "yield".to_string(),
            props: serde_json::json!({ "value": input.calculation.overall_yield }),
        });
    }

    sections.push("validation".to_string());
    components.push(ComponentSpec {
        id: "validation_summary".to_string(),
        component_type: "summary".to_string(),
        variant: match input.validation.overall_status {
            common::storage::types::validation_report::OverallStatus::Pass => "pass".to_string(),
            common::storage::types::validation_report::OverallStatus::Warn => "warn".to_string(),
            common::storage::types::validation_report::OverallStatus::Fail => "fail".to_string(),
        },
        props: serde_json::json!({ "checkCount": input.validation.checks.len() }),
    });

    let mut contrast_ratios = HashMap::new();
    contrast_ratios.insert("foreground_on_background".to_string(), contrast);

    let now = chrono::Utc::now();
    Ok(UIConfig {
        id: format!("uiconfig:{}", uuid::Uuid::new_v4()),
        created_at: now,
        updated_at: now,
        layout: Layout {
            layout_type: "responsive_grid".to_string(),
            sections,
            columns: 12,
            breakpoints: vec![
                Breakpoint { name: "mobile".to_string(), min_width_px: 360 },
                Breakpoint { name: "tablet".to_string(), min_width_px: 768 },
                Breakpoint { name: "desktop".to_string(), min_width_px: 1280 },
            ],
        },
        theme: Theme {
            palette: serde_json::json!({ "foreground": DEFAULT_FOREGROUND, "background": DEFAULT_BACKGROUND }),
            typography: serde_json::json!({ "base_font_family": "system-ui", "base_size_px": 16 }),
            spacing: serde_json::json!({ "unit_px": 8 }),
        },
        components,
        accessibility: Accessibility {
            wcag_level: if contrast >= WCAG_AA_MIN_CONTRAST { "AA".to_string() } else { "fail".to_string() },
            contrast_ratios,
        },
    })
}

/// WCAG 2.x relative luminance contrast ratio between two `#rrggbb` colors.
fn contrast_ratio(foreground_hex: &str, background_hex: &str) -> Option<f64> {
    let foreground = relative_luminance(foreground_hex)?;
    let background = relative_luminance(background_hex)?;
    let (lighter, darker) = if foreground >= background {
        (foreground, background)
    } else {
        (background, foreground)
    };
    Some((lighter + 0.05) / (darker + 0.05))
}

fn relative_luminance(hex: &str) -> Option<f64> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;

    let channel = |value: u8| -> f64 {
        let normalized = f64::from(value) / 255.0;
        if normalized <= 0.039_28 {
            normalized / 12.92
        } else {
            ((normalized + 0.055) / 1.055).powf(2.4)
        }
    };

    Some(0.2126 * channel(r) + 0.7152 * channel(g) + 0.0722 * channel(b))
}
