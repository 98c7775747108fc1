//! Common types used across the kitchen stock platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the user performing an operation, supplied by the auth layer
pub type ActorId = Uuid;

/// Measurement unit of an ingredient
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Pcs,
    Kg,
    Ltr,
    G,
    Ml,
    Lb,
    Oz,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Pcs => "pcs",
            Unit::Kg => "kg",
            Unit::Ltr => "ltr",
            Unit::G => "g",
            Unit::Ml => "ml",
            Unit::Lb => "lb",
            Unit::Oz => "oz",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pcs" => Some(Unit::Pcs),
            "kg" => Some(Unit::Kg),
            "ltr" => Some(Unit::Ltr),
            "g" => Some(Unit::G),
            "ml" => Some(Unit::Ml),
            "lb" => Some(Unit::Lb),
            "oz" => Some(Unit::Oz),
            _ => None,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingredient category, drives default shelf life
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    Vegetables,
    Fruits,
    Dairy,
    Meat,
    Seafood,
    Grains,
    Spices,
    Beverages,
    Frozen,
    Canned,
    #[default]
    Other,
}

impl IngredientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngredientCategory::Vegetables => "vegetables",
            IngredientCategory::Fruits => "fruits",
            IngredientCategory::Dairy => "dairy",
            IngredientCategory::Meat => "meat",
            IngredientCategory::Seafood => "seafood",
            IngredientCategory::Grains => "grains",
            IngredientCategory::Spices => "spices",
            IngredientCategory::Beverages => "beverages",
            IngredientCategory::Frozen => "frozen",
            IngredientCategory::Canned => "canned",
            IngredientCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vegetables" => Some(IngredientCategory::Vegetables),
            "fruits" => Some(IngredientCategory::Fruits),
            "dairy" => Some(IngredientCategory::Dairy),
            "meat" => Some(IngredientCategory::Meat),
            "seafood" => Some(IngredientCategory::Seafood),
            "grains" => Some(IngredientCategory::Grains),
            "spices" => Some(IngredientCategory::Spices),
            "beverages" => Some(IngredientCategory::Beverages),
            "frozen" => Some(IngredientCategory::Frozen),
            "canned" => Some(IngredientCategory::Canned),
            "other" => Some(IngredientCategory::Other),
            _ => None,
        }
    }
}

/// Where an ingredient is kept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageCondition {
    Fridge,
    Freezer,
    #[default]
    NormalTemperature,
    RoomTemperature,
    Pantry,
    DryStorage,
}

impl StorageCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageCondition::Fridge => "fridge",
            StorageCondition::Freezer => "freezer",
            StorageCondition::NormalTemperature => "normal_temperature",
            StorageCondition::RoomTemperature => "room_temperature",
            StorageCondition::Pantry => "pantry",
            StorageCondition::DryStorage => "dry_storage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fridge" => Some(StorageCondition::Fridge),
            "freezer" => Some(StorageCondition::Freezer),
            "normal_temperature" => Some(StorageCondition::NormalTemperature),
            "room_temperature" => Some(StorageCondition::RoomTemperature),
            "pantry" => Some(StorageCondition::Pantry),
            "dry_storage" => Some(StorageCondition::DryStorage),
            _ => None,
        }
    }
}

/// Condition of produce when it was received
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Fresh,
    Good,
    Fair,
}

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
