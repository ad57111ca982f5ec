//! Durable storage for devices and their movement logs.
//!
//! The ledger only talks to these traits. Quantity columns change exclusively
//! through [`DeviceStore::create`] and [`DeviceStore::apply_delta`], and
//! log entries are only appended, removed, or annotated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DbErr;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    device,
    device_log::{self, MovementMode, QuantityDelta},
};

mod database;

pub use database::{SeaOrmDeviceLogStore, SeaOrmDeviceStore};

/// Fields of a device created by its first insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDevice {
    pub name: String,
    pub device_type: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub qty: i64,
}

/// A movement log entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeviceLog {
    pub device_id: Uuid,
    pub mode: MovementMode,
    pub qty: i64,
    pub author_id: String,
    pub price: Option<Decimal>,
    pub vendor: Option<String>,
    pub date_of_purchase: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
}

/// Descriptive edit of a device. Quantities are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct DeviceDetailsUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub device_type: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
}

/// Provenance edit of a log entry. Mode, qty and device are immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct ProvenanceUpdate {
    pub price: Option<Decimal>,
    #[validate(length(max = 200))]
    pub vendor: Option<String>,
    pub date_of_purchase: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
}

/// One page of records plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Inserts a device whose available and purchased quantities both equal `qty`.
    async fn create(&self, device: NewDevice) -> Result<device::Model, DbErr>;

    /// Atomically adds `delta` to the quantity columns and returns the updated
    /// row, or `None` when no such device exists.
    async fn apply_delta(
        &self,
        device_id: Uuid,
        delta: QuantityDelta,
    ) -> Result<Option<device::Model>, DbErr>;

    /// Deletes the device only while its available quantity is still `<= 0`.
    /// Returns whether a row was removed.
    async fn delete_if_depleted(&self, device_id: Uuid) -> Result<bool, DbErr>;

    /// Unconditional delete. Returns whether a row was removed.
    async fn delete(&self, device_id: Uuid) -> Result<bool, DbErr>;

    async fn find(&self, device_id: Uuid) -> Result<Option<device::Model>, DbErr>;

    async fn update_details(
        &self,
        device_id: Uuid,
        details: DeviceDetailsUpdate,
    ) -> Result<Option<device::Model>, DbErr>;

    async fn list(&self, page: u64, limit: u64) -> Result<Page<device::Model>, DbErr>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceLogStore: Send + Sync {
    async fn append(&self, entry: NewDeviceLog) -> Result<device_log::Model, DbErr>;

    /// Finds and deletes an entry in one step. Of two concurrent callers at
    /// most one receives the entry.
    async fn take(&self, devicelog_id: Uuid) -> Result<Option<device_log::Model>, DbErr>;

    async fn find(&self, devicelog_id: Uuid) -> Result<Option<device_log::Model>, DbErr>;

    /// All entries referencing a device, oldest first.
    async fn find_by_device(&self, device_id: Uuid) -> Result<Vec<device_log::Model>, DbErr>;

    async fn update_provenance(
        &self,
        devicelog_id: Uuid,
        update: ProvenanceUpdate,
    ) -> Result<Option<device_log::Model>, DbErr>;

    async fn list(&self, page: u64, limit: u64) -> Result<Page<device_log::Model>, DbErr>;
}
