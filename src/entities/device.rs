use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A distinct inventory item type and its stock aggregate.
///
/// `qty_available` and `qty_purchased` are running totals maintained by the
/// ledger; nothing outside delta application writes them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub device_id: Uuid,
    pub name: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub device_type: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub qty_available: i64,
    pub qty_purchased: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stock at or below zero retires the device once a reversal lands.
    pub fn is_depleted(&self) -> bool {
        self.qty_available <= 0
    }
}
