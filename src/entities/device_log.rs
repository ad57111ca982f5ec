use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Direction of a stock movement. Fixed when the log entry is written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    #[default]
    #[sea_orm(string_value = "stock_insert")]
    #[serde(alias = "stock_insert")]
    Insert,
    #[sea_orm(string_value = "stock_remove")]
    #[serde(alias = "stock_remove")]
    Remove,
}

impl MovementMode {
    /// Signed effect of a movement of `qty` units on the device aggregate.
    pub fn delta(self, qty: i64) -> QuantityDelta {
        match self {
            MovementMode::Insert => QuantityDelta {
                available: qty,
                purchased: qty,
            },
            MovementMode::Remove => QuantityDelta {
                available: -qty,
                purchased: 0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementMode::Insert => "insert",
            MovementMode::Remove => "remove",
        }
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Increment applied to a device's quantity columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuantityDelta {
    pub available: i64,
    pub purchased: i64,
}

impl QuantityDelta {
    /// The delta that exactly cancels this one.
    pub fn inverse(self) -> Self {
        Self {
            available: -self.available,
            purchased: -self.purchased,
        }
    }
}

/// One movement event. Only the provenance fields (price, vendor,
/// date_of_purchase, remarks) change after creation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub devicelog_id: Uuid,
    pub device_id: Uuid,
    pub mode: MovementMode,
    pub qty: i64,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub price: Option<Decimal>,
    pub vendor: Option<String>,
    pub date_of_purchase: DateTime<Utc>,
    pub author_id: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Signed effect this entry had on its device when it was recorded.
    pub fn delta(&self) -> QuantityDelta {
        self.mode.delta(self.qty)
    }
}
