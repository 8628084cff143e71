pub mod fields;

use thiserror::Error;
use tracing::{info, warn};

use crate::record::Record;
use crate::source::{DocumentSource, Locator, SourceError};
use crate::variants::VariantContext;
use fields::{parse_abilities, parse_generation, parse_int, parse_measure, split_categories, title_case};

#[derive(Debug, Error)]
pub enum ExtractError {
    /// A mandatory field was absent, or non-numeric where a number is required.
    #[error("required field `{field}` missing: {reason}")]
    RequiredFieldMissing { field: &'static str, reason: String },
}

impl ExtractError {
    fn missing(field: &'static str, err: SourceError) -> Self {
        ExtractError::RequiredFieldMissing {
            field,
            reason: err.to_string(),
        }
    }

    fn malformed(field: &'static str, raw: &str) -> Self {
        ExtractError::RequiredFieldMissing {
            field,
            reason: format!("not a number: {raw:?}"),
        }
    }
}

/// Outcome of an optional field: parsed, or recovered as null.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome<T> {
    Parsed(T),
    Recovered(RecoveredField),
}

impl<T> FieldOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldOutcome::Parsed(v) => Some(v),
            FieldOutcome::Recovered(_) => None,
        }
    }
}

/// A field that failed to parse and was stored as null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredField {
    pub field: &'static str,
    pub raw: String,
}

#[derive(Debug)]
pub struct Extraction {
    pub record: Record,
    pub recovered: Vec<RecoveredField>,
}

/// Compiled locators for every extracted field.
#[derive(Debug, Clone)]
pub struct FieldLocators {
    pub name: Locator,
    pub index: Locator,
    pub types: Locator,
    pub species: Locator,
    pub height: Locator,
    pub weight: Locator,
    pub abilities: Locator,
    pub hp: Locator,
    pub attack: Locator,
    pub defence: Locator,
    pub sp_attack: Locator,
    pub sp_defence: Locator,
    pub speed: Locator,
    pub total: Locator,
    pub generation: Option<Locator>,
}

pub struct FieldExtractor {
    locators: FieldLocators,
}

impl FieldExtractor {
    pub fn new(locators: FieldLocators) -> Self {
        FieldExtractor { locators }
    }

    /// Read every field from the variant's current rendering.
    pub async fn extract<S: DocumentSource>(
        &self,
        variant: &VariantContext<'_, S>,
    ) -> Result<Extraction, ExtractError> {
        let src = variant.source();
        let loc = &self.locators;
        let mut recovered = Vec::new();

        let catalog_index = required_int(src, "index", &loc.index).await?;
        let name = title_case(&required_text(src, "name", &loc.name).await?);

        let variant_label = variant
            .label()
            .map(str::trim)
            .filter(|label| *label != name)
            .map(str::to_string);

        info!(
            "{:04}: {:>15} = {}",
            catalog_index,
            name,
            variant_label.as_deref().unwrap_or(&name)
        );

        let types = required_text(src, "types", &loc.types).await?;
        let (category_primary, category_secondary) =
            split_categories(&types).ok_or_else(|| ExtractError::RequiredFieldMissing {
                field: "types",
                reason: "empty".to_string(),
            })?;

        let species = title_case(&required_text(src, "species", &loc.species).await?);

        let height = measure(src, "height", &loc.height, "m").await?;
        let weight = measure(src, "weight", &loc.weight, "kg").await?;
        for outcome in [&height, &weight] {
            if let FieldOutcome::Recovered(r) = outcome {
                warn!("{:04} {}: unparseable {} {:?}, stored as null", catalog_index, name, r.field, r.raw);
                recovered.push(r.clone());
            }
        }

        let ability_text = required_text(src, "abilities", &loc.abilities).await?;
        if ability_text.is_empty() {
            return Err(ExtractError::RequiredFieldMissing {
                field: "abilities",
                reason: "empty".to_string(),
            });
        }
        let abilities = parse_abilities(&ability_text);

        let hp = required_stat(src, "hp", &loc.hp).await?;
        let attack = required_stat(src, "attack", &loc.attack).await?;
        let defence = required_stat(src, "defence", &loc.defence).await?;
        let sp_attack = required_stat(src, "sp_attack", &loc.sp_attack).await?;
        let sp_defence = required_stat(src, "sp_defence", &loc.sp_defence).await?;
        let speed = required_stat(src, "speed", &loc.speed).await?;
        let total = required_stat(src, "total", &loc.total).await?;

        let generation = match &loc.generation {
            Some(locator) => src.text(locator).await.ok().and_then(|s| parse_generation(&s)),
            None => None,
        };

        let record = Record {
            ordinal: variant.ordinal(),
            catalog_index,
            name,
            variant_label,
            category_primary,
            category_secondary,
            species,
            height: height.into_option(),
            weight: weight.into_option(),
            ability_primary: abilities.primary,
            ability_secondary: abilities.secondary,
            ability_hidden: abilities.hidden,
            hp,
            attack,
            defence,
            sp_attack,
            sp_defence,
            speed,
            total,
            generation,
        };

        Ok(Extraction { record, recovered })
    }
}

async fn required_text<S: DocumentSource>(
    src: &S,
    field: &'static str,
    locator: &Locator,
) -> Result<String, ExtractError> {
    src.text(locator)
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| ExtractError::missing(field, e))
}

async fn required_int<S: DocumentSource>(
    src: &S,
    field: &'static str,
    locator: &Locator,
) -> Result<i64, ExtractError> {
    let raw = required_text(src, field, locator).await?;
    parse_int(&raw).ok_or_else(|| ExtractError::malformed(field, &raw))
}

async fn required_stat<S: DocumentSource>(
    src: &S,
    field: &'static str,
    locator: &Locator,
) -> Result<i32, ExtractError> {
    let raw = required_text(src, field, locator).await?;
    parse_int(&raw)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| ExtractError::malformed(field, &raw))
}

/// Location must exist; only the number itself may fail and be recovered.
async fn measure<S: DocumentSource>(
    src: &S,
    field: &'static str,
    locator: &Locator,
    unit: &str,
) -> Result<FieldOutcome<f64>, ExtractError> {
    let raw = required_text(src, field, locator).await?;
    Ok(match parse_measure(&raw, unit) {
        Some(v) => FieldOutcome::Parsed(v),
        None => FieldOutcome::Recovered(RecoveredField { field, raw }),
    })
}
