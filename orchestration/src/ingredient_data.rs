use common::cache::CacheLayer;

/// Default density (g/mL) used when an ingredient has no entry in the density
/// table and the cache holds nothing either — most dry F&B ingredients cluster
/// close to water density, so this keeps mass/volume conversions from failing
/// outright on unfamiliar ingredients rather than aborting the run.
pub const DEFAULT_DENSITY_G_PER_ML: f64 = 1.0;

/// Default unit cost ($/kg) used under the same fallback conditions.
pub const DEFAULT_COST_PER_KG: f64 = 2.5;

fn density_table() -> &'static [(&'static str, f64)] {
    &[
        ("oat_flour", 0.45),
        ("whey", 0.55),
        ("water", 1.0),
        ("sugar", 0.85),
        ("cocoa_powder", 0.51),
        ("vegetable_oil", 0.92),
        ("salt", 1.2),
    ]
}

fn cost_table() -> &'static [(&'static str, f64)] {
    &[
        ("oat_flour", 1.8),
        ("whey", 6.5),
        ("water", 0.01),
        ("sugar", 0.9),
        ("cocoa_powder", 4.2),
        ("vegetable_oil", 1.6),
        ("salt", 0.3),
    ]
}

/// Looks up an ingredient's density, checking the cache first, falling back
/// to the static table, and finally to [`DEFAULT_DENSITY_G_PER_ML`].
pub fn density_for(caches: &CacheLayer, ingredient_id: &str) -> f64 {
    let cache_key = format!("den:{ingredient_id}");
    if let Some(cached) = caches.density.get(&cache_key) {
        return cached;
    }

    let value = density_table()
        .iter()
        .find(|(id, _)| *id == ingredient_id)
        .map_or(DEFAULT_DENSITY_G_PER_ML, |(_, density)| *density);

    caches.density.insert(cache_key, value);
    value
}

/// Looks up an ingredient's unit cost ($/kg), same cache-then-table-then-default policy.
pub fn cost_per_kg_for(caches: &CacheLayer, ingredient_id: &str) -> f64 {
    let cache_key = format!("cost:{ingredient_id}");
    if let Some(cached) = caches.cost.get(&cache_key) {
        return cached;
    }

    let value = cost_table()
        .iter()
        .find(|(id, _)| *id == ingredient_id)
        .map_or(DEFAULT_COST_PER_KG, |(_, cost)| *cost);

    caches.cost.insert(cache_key, value);
    value
}
