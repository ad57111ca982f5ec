use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{
    DeviceDetailsUpdate, DeviceLogStore, DeviceStore, NewDevice, NewDeviceLog, Page,
    ProvenanceUpdate,
};
use crate::entities::{
    device::{self, Entity as Device},
    device_log::{self, Entity as DeviceLog, QuantityDelta},
};

/// Device store backed by a sea-orm connection (Postgres or SQLite).
#[derive(Debug, Clone)]
pub struct SeaOrmDeviceStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDeviceStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceStore for SeaOrmDeviceStore {
    async fn create(&self, new_device: NewDevice) -> Result<device::Model, DbErr> {
        let now = Utc::now();
        let model = device::ActiveModel {
            device_id: Set(Uuid::new_v4()),
            name: Set(new_device.name),
            device_type: Set(new_device.device_type),
            description: Set(new_device.description),
            image: Set(new_device.image),
            qty_available: Set(new_device.qty),
            qty_purchased: Set(new_device.qty),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(self.db.as_ref()).await
    }

    async fn apply_delta(
        &self,
        device_id: Uuid,
        delta: QuantityDelta,
    ) -> Result<Option<device::Model>, DbErr> {
        let txn = self.db.begin().await?;

        // Single UPDATE with column arithmetic; concurrent deltas sum in any order.
        let result = Device::update_many()
            .col_expr(
                device::Column::QtyAvailable,
                Expr::col(device::Column::QtyAvailable).add(delta.available),
            )
            .col_expr(
                device::Column::QtyPurchased,
                Expr::col(device::Column::QtyPurchased).add(delta.purchased),
            )
            .col_expr(device::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(device::Column::DeviceId.eq(device_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let updated = Device::find_by_id(device_id).one(&txn).await?;
        txn.commit().await?;

        debug!(%device_id, ?delta, "applied quantity delta");
        Ok(updated)
    }

    async fn delete_if_depleted(&self, device_id: Uuid) -> Result<bool, DbErr> {
        let result = Device::delete_many()
            .filter(device::Column::DeviceId.eq(device_id))
            .filter(device::Column::QtyAvailable.lte(0))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, device_id: Uuid) -> Result<bool, DbErr> {
        let result = Device::delete_by_id(device_id)
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn find(&self, device_id: Uuid) -> Result<Option<device::Model>, DbErr> {
        Device::find_by_id(device_id).one(self.db.as_ref()).await
    }

    async fn update_details(
        &self,
        device_id: Uuid,
        details: DeviceDetailsUpdate,
    ) -> Result<Option<device::Model>, DbErr> {
        let mut update = Device::update_many()
            .col_expr(device::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(device::Column::DeviceId.eq(device_id));

        if let Some(name) = details.name {
            update = update.col_expr(device::Column::Name, Expr::value(name));
        }
        if let Some(device_type) = details.device_type {
            update = update.col_expr(device::Column::DeviceType, Expr::value(device_type));
        }
        if let Some(description) = details.description {
            update = update.col_expr(device::Column::Description, Expr::value(description));
        }
        if let Some(image) = details.image {
            update = update.col_expr(device::Column::Image, Expr::value(image));
        }

        let result = update.exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find(device_id).await
    }

    async fn list(&self, page: u64, limit: u64) -> Result<Page<device::Model>, DbErr> {
        let paginator = Device::find()
            .order_by_desc(device::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }
}

/// Device log store backed by a sea-orm connection.
#[derive(Debug, Clone)]
pub struct SeaOrmDeviceLogStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDeviceLogStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceLogStore for SeaOrmDeviceLogStore {
    async fn append(&self, entry: NewDeviceLog) -> Result<device_log::Model, DbErr> {
        let now = Utc::now();
        let model = device_log::ActiveModel {
            devicelog_id: Set(Uuid::new_v4()),
            device_id: Set(entry.device_id),
            mode: Set(entry.mode),
            qty: Set(entry.qty),
            price: Set(entry.price),
            vendor: Set(entry.vendor),
            date_of_purchase: Set(entry.date_of_purchase.unwrap_or(now)),
            author_id: Set(entry.author_id),
            remarks: Set(entry.remarks),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(self.db.as_ref()).await
    }

    async fn take(&self, devicelog_id: Uuid) -> Result<Option<device_log::Model>, DbErr> {
        let txn = self.db.begin().await?;

        let Some(entry) = DeviceLog::find_by_id(devicelog_id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        // A concurrent reversal may have removed it between the read and here.
        let result = DeviceLog::delete_by_id(devicelog_id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        txn.commit().await?;
        Ok(Some(entry))
    }

    async fn find(&self, devicelog_id: Uuid) -> Result<Option<device_log::Model>, DbErr> {
        DeviceLog::find_by_id(devicelog_id)
            .one(self.db.as_ref())
            .await
    }

    async fn find_by_device(&self, device_id: Uuid) -> Result<Vec<device_log::Model>, DbErr> {
        DeviceLog::find()
            .filter(device_log::Column::DeviceId.eq(device_id))
            .order_by_asc(device_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
    }

    async fn update_provenance(
        &self,
        devicelog_id: Uuid,
        update: ProvenanceUpdate,
    ) -> Result<Option<device_log::Model>, DbErr> {
        let mut statement = DeviceLog::update_many()
            .col_expr(device_log::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(device_log::Column::DevicelogId.eq(devicelog_id));

        if let Some(price) = update.price {
            statement = statement.col_expr(device_log::Column::Price, Expr::value(price));
        }
        if let Some(vendor) = update.vendor {
            statement = statement.col_expr(device_log::Column::Vendor, Expr::value(vendor));
        }
        if let Some(date_of_purchase) = update.date_of_purchase {
            statement = statement.col_expr(
                device_log::Column::DateOfPurchase,
                Expr::value(date_of_purchase),
            );
        }
        if let Some(remarks) = update.remarks {
            statement = statement.col_expr(device_log::Column::Remarks, Expr::value(remarks));
        }

        let result = statement.exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find(devicelog_id).await
    }

    async fn list(&self, page: u64, limit: u64) -> Result<Page<device_log::Model>, DbErr> {
        let paginator = DeviceLog::find()
            .order_by_desc(device_log::Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(Page { items, total })
    }
}
