use serde::Serialize;

/// One catalog entry (or one of its alternate forms) as extracted from the
/// page. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub ordinal: u32,
    pub catalog_index: i64,
    pub name: String,
    pub variant_label: Option<String>,
    pub category_primary: String,
    pub category_secondary: Option<String>,
    pub species: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub ability_primary: Option<String>,
    pub ability_secondary: Option<String>,
    pub ability_hidden: Option<String>,
    pub hp: i32,
    pub attack: i32,
    pub defence: i32,
    pub sp_attack: i32,
    pub sp_defence: i32,
    pub speed: i32,
    pub total: i32,
    pub generation: Option<String>,
}

/// Column names in export order.
pub const COLUMNS: &[&str] = &[
    "ordinal",
    "catalog_index",
    "name",
    "variant_label",
    "category_primary",
    "category_secondary",
    "species",
    "height",
    "weight",
    "ability_primary",
    "ability_secondary",
    "ability_hidden",
    "hp",
    "attack",
    "defence",
    "sp_attack",
    "sp_defence",
    "speed",
    "total",
    "generation",
];

impl Record {
    /// Sum of the six stats, widened so out-of-range cells cannot overflow.
    pub fn stat_sum(&self) -> i64 {
        [self.hp, self.attack, self.defence, self.sp_attack, self.sp_defence, self.speed]
            .iter()
            .map(|&v| i64::from(v))
            .sum()
    }

    /// Whether the printed total agrees with the six stats. Not enforced.
    pub fn total_matches(&self) -> bool {
        self.stat_sum() == i64::from(self.total)
    }

    #[cfg(test)]
    pub fn has_no_ability(&self) -> bool {
        self.ability_primary.is_none() && self.ability_secondary.is_none() && self.ability_hidden.is_none()
    }

    /// Label used in progress lines: the form when present, else the name.
    pub fn display_form(&self) -> &str {
        self.variant_label.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
pub(crate) fn sample(ordinal: u32, index: i64, label: Option<&str>) -> Record {
    Record {
        ordinal,
        catalog_index: index,
        name: "Venusaur".to_string(),
        variant_label: label.map(str::to_string),
        category_primary: "Grass".to_string(),
        category_secondary: Some("Poison".to_string()),
        species: "Seed Pokémon".to_string(),
        height: Some(2.0),
        weight: Some(100.0),
        ability_primary: Some("Overgrow".to_string()),
        ability_secondary: None,
        ability_hidden: Some("Chlorophyll".to_string()),
        hp: 80,
        attack: 82,
        defence: 83,
        sp_attack: 100,
        sp_defence: 100,
        speed: 80,
        total: 525,
        generation: Some("1".to_string()),
    }
}
