use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::LedgerOutcome;
use crate::entities::{device, device_log, device_log::MovementMode};

/// A requested stock movement.
///
/// Without `device_id` the movement must be an insertion and creates the
/// device from `name`, `type`, `description` and `image`. With `device_id` the
/// descriptive fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct MovementIntent {
    pub device_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub device_type: Option<String>,
    #[validate(range(min = 1))]
    pub qty: i64,
    #[serde(default)]
    pub mode: MovementMode,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    pub price: Option<Decimal>,
    #[validate(length(max = 200))]
    pub vendor: Option<String>,
    pub date_of_purchase: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
}

impl MovementIntent {
    /// Insertion that creates a new device.
    pub fn new_device(name: impl Into<String>, device_type: impl Into<String>, qty: i64) -> Self {
        Self {
            name: Some(name.into()),
            device_type: Some(device_type.into()),
            qty,
            mode: MovementMode::Insert,
            ..Default::default()
        }
    }

    /// Insertion against an existing device.
    pub fn insert(device_id: Uuid, qty: i64) -> Self {
        Self {
            device_id: Some(device_id),
            qty,
            mode: MovementMode::Insert,
            ..Default::default()
        }
    }

    /// Drops the device-creation fields when the movement targets an existing
    /// device, so they are neither validated nor used.
    pub fn normalized(mut self) -> Self {
        if self.device_id.is_some() {
            self.name = None;
            self.device_type = None;
            self.description = None;
            self.image = None;
        }
        self
    }

    /// Removal from an existing device.
    pub fn remove(device_id: Uuid, qty: i64) -> Self {
        Self {
            device_id: Some(device_id),
            qty,
            mode: MovementMode::Remove,
            ..Default::default()
        }
    }
}

/// Result of a fully applied movement.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedMovement {
    pub device_id: Uuid,
    pub devicelog_id: Uuid,
    pub device_created: bool,
    /// Set when a removal left `qty_available` below zero. Accepted, not corrected.
    pub negative_stock: bool,
    pub device: device::Model,
    pub log: device_log::Model,
    pub outcome: LedgerOutcome,
}

/// Result of a fully applied reversal.
#[derive(Debug, Clone, Serialize)]
pub struct ReversedMovement {
    pub devicelog_id: Uuid,
    pub device_id: Uuid,
    pub device_deleted: bool,
    /// Device state after the inverse delta; `None` once deleted.
    pub device: Option<device::Model>,
    pub outcome: LedgerOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceWithHistory {
    #[serde(flatten)]
    pub device: device::Model,
    pub device_logs: Vec<device_log::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogWithDevice {
    #[serde(flatten)]
    pub log: device_log::Model,
    /// `None` when the device was already retired.
    pub device: Option<device::Model>,
}
