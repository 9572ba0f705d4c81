use serde::{Deserialize, Serialize};

use crate::stored_object;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    #[serde(rename = "type")]
    pub layout_type: String,
    pub sections: Vec<String>,
    pub columns: u32,
    pub breakpoints: Vec<Breakpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breakpoint {
    pub name: String,
    pub min_width_px: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub palette: serde_json::Value,
    pub typography: serde_json::Value,
    pub spacing: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub variant: String,
    pub props: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Accessibility {
    pub wcag_level: String,
    pub contrast_ratios: std::collections::HashMap<String, f64>,
}

stored_object!(UIConfig, "ui_config", {
    layout: Layout,
    theme: Theme,
    components: Vec<ComponentSpec>,
    accessibility: Accessibility,
});

/// WCAG AA minimum contrast ratio for normal-size text.
pub const WCAG_AA_MIN_CONTRAST: f64 = 4.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessibility_round_trips_through_json() {
        let mut ratios = std::collections::HashMap::new();
        ratios.insert("foreground_on_background".to_string(), 7.1);
        let accessibility = Accessibility {
            wcag_level: "AA".into(),
            contrast_ratios: ratios,
        };
        let value = serde_json::to_value(&accessibility).expect("serialize");
        let back: Accessibility = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, accessibility);
    }
}
