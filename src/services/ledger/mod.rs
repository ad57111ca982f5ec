//! Stock ledger engine.
//!
//! Keeps each device's aggregate (`qty_available`, `qty_purchased`) consistent
//! with its movement log. Recording a movement is two writes (aggregate, then
//! log) and reversing one is up to three (log delete, inverse delta, cascade
//! delete). There is no transaction spanning them: a failure part way through
//! is returned with a step report instead of being rolled back.

use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{device, device_log, device_log::MovementMode},
    errors::LedgerError,
    events::{Event, EventSender},
    stores::{
        DeviceDetailsUpdate, DeviceLogStore, DeviceStore, NewDevice, NewDeviceLog, Page,
        ProvenanceUpdate, SeaOrmDeviceLogStore, SeaOrmDeviceStore,
    },
};

mod outcome;
mod types;

pub use outcome::{LedgerOutcome, LedgerStep, StepReport, StepStatus};
pub use types::{DeviceWithHistory, LogWithDevice, MovementIntent, RecordedMovement, ReversedMovement};

#[derive(Clone)]
pub struct LedgerEngine {
    devices: Arc<dyn DeviceStore>,
    logs: Arc<dyn DeviceLogStore>,
    event_sender: Option<EventSender>,
}

impl LedgerEngine {
    pub fn new(devices: Arc<dyn DeviceStore>, logs: Arc<dyn DeviceLogStore>) -> Self {
        Self {
            devices,
            logs,
            event_sender: None,
        }
    }

    /// Engine over sea-orm stores sharing one connection pool.
    pub fn with_database(db: Arc<DatabaseConnection>) -> Self {
        Self::new(
            Arc::new(SeaOrmDeviceStore::new(db.clone())),
            Arc::new(SeaOrmDeviceLogStore::new(db)),
        )
    }

    pub fn with_events(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Applies a movement to its device (creating the device for a first
    /// insertion) and appends the matching log entry authored by `actor`.
    #[instrument(skip(self, intent), fields(device_id = ?intent.device_id, mode = %intent.mode, qty = intent.qty))]
    pub async fn record_movement(
        &self,
        intent: MovementIntent,
        actor: &str,
    ) -> Result<RecordedMovement, LedgerError> {
        if intent.mode == MovementMode::Remove && intent.device_id.is_none() {
            return Err(LedgerError::InvalidRequest(
                "Device ID is required for stock removal".to_string(),
            ));
        }
        let intent = intent.normalized();
        intent.validate()?;

        let MovementIntent {
            device_id,
            name,
            device_type,
            qty,
            mode,
            description,
            image,
            price,
            vendor,
            date_of_purchase,
            remarks,
        } = intent;

        let (device, aggregate_step) = match device_id {
            Some(device_id) => {
                let device = self
                    .devices
                    .apply_delta(device_id, mode.delta(qty))
                    .await
                    .map_err(|source| {
                        aggregate_failure(LedgerStep::DeviceUpdate, LedgerStep::LogCreate, source)
                    })?
                    .ok_or_else(|| {
                        LedgerError::NotFound(format!("Device {} not found", device_id))
                    })?;
                (device, LedgerStep::DeviceUpdate)
            }
            None => {
                let (name, device_type) = match (name, device_type) {
                    (Some(name), Some(device_type)) => (name, device_type),
                    _ => {
                        return Err(LedgerError::InvalidRequest(
                            "name and type are required to create a device".to_string(),
                        ))
                    }
                };
                let device = self
                    .devices
                    .create(NewDevice {
                        name,
                        device_type,
                        description,
                        image,
                        qty,
                    })
                    .await
                    .map_err(|source| {
                        aggregate_failure(LedgerStep::DeviceCreate, LedgerStep::LogCreate, source)
                    })?;
                info!(device_id = %device.device_id, qty, "device created by first insertion");
                self.publish(Event::DeviceCreated {
                    device_id: device.device_id,
                    qty,
                })
                .await;
                (device, LedgerStep::DeviceCreate)
            }
        };

        let entry = NewDeviceLog {
            device_id: device.device_id,
            mode,
            qty,
            author_id: actor.to_string(),
            price,
            vendor,
            date_of_purchase,
            remarks,
        };

        let log = match self.logs.append(entry).await {
            Ok(log) => log,
            Err(source) => {
                counter!("stock_ledger.partial_failures", 1);
                error!(
                    device_id = %device.device_id,
                    error = %source,
                    "aggregate written but device log creation failed"
                );
                return Err(LedgerError::LogWriteFailed {
                    outcome: LedgerOutcome::default()
                        .succeeded(aggregate_step)
                        .failed(LedgerStep::LogCreate),
                    source,
                });
            }
        };

        let negative_stock = device.qty_available < 0;
        if negative_stock {
            counter!("stock_ledger.negative_stock", 1);
            warn!(
                device_id = %device.device_id,
                qty_available = device.qty_available,
                "removal left device with negative available stock"
            );
        }

        counter!("stock_ledger.movements.recorded", 1);
        info!(
            device_id = %device.device_id,
            devicelog_id = %log.devicelog_id,
            qty_available = device.qty_available,
            qty_purchased = device.qty_purchased,
            "movement recorded"
        );
        self.publish(Event::MovementRecorded {
            device_id: device.device_id,
            devicelog_id: log.devicelog_id,
            mode,
            qty,
            author_id: log.author_id.clone(),
        })
        .await;

        Ok(RecordedMovement {
            device_id: device.device_id,
            devicelog_id: log.devicelog_id,
            device_created: aggregate_step == LedgerStep::DeviceCreate,
            negative_stock,
            device,
            log,
            outcome: LedgerOutcome::default()
                .succeeded(aggregate_step)
                .succeeded(LedgerStep::LogCreate),
        })
    }

    /// Deletes a log entry and undoes its effect on the device. A device left
    /// with `qty_available <= 0` is deleted.
    #[instrument(skip(self))]
    pub async fn reverse_movement(
        &self,
        devicelog_id: Uuid,
    ) -> Result<ReversedMovement, LedgerError> {
        let log = self
            .logs
            .take(devicelog_id)
            .await
            .map_err(|source| LedgerError::LogWriteFailed {
                outcome: LedgerOutcome::default()
                    .failed(LedgerStep::LogDelete)
                    .skipped(LedgerStep::DeviceUpdate),
                source,
            })?
            .ok_or_else(|| LedgerError::NotFound(format!("Device log {} not found", devicelog_id)))?;

        let device_id = log.device_id;
        let inverse = log.delta().inverse();

        let device = match self.devices.apply_delta(device_id, inverse).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                // Orphaned entry: its device was already retired.
                counter!("stock_ledger.partial_failures", 1);
                warn!(%device_id, %devicelog_id, "reversed log referenced a missing device");
                return Err(LedgerError::AggregateWriteFailed {
                    outcome: LedgerOutcome::default()
                        .succeeded(LedgerStep::LogDelete)
                        .failed(LedgerStep::DeviceUpdate),
                    source: DbErr::RecordNotFound(format!("device {}", device_id)),
                });
            }
            Err(source) => {
                counter!("stock_ledger.partial_failures", 1);
                error!(%device_id, %devicelog_id, error = %source, "log deleted but device update failed");
                return Err(LedgerError::AggregateWriteFailed {
                    outcome: LedgerOutcome::default()
                        .succeeded(LedgerStep::LogDelete)
                        .failed(LedgerStep::DeviceUpdate),
                    source,
                });
            }
        };

        counter!("stock_ledger.movements.reversed", 1);
        self.publish(Event::MovementReversed {
            device_id,
            devicelog_id,
            mode: log.mode,
            qty: log.qty,
        })
        .await;

        let outcome = LedgerOutcome::default()
            .succeeded(LedgerStep::LogDelete)
            .succeeded(LedgerStep::DeviceUpdate);

        if !device.is_depleted() {
            info!(
                %device_id,
                %devicelog_id,
                qty_available = device.qty_available,
                "movement reversed"
            );
            return Ok(ReversedMovement {
                devicelog_id,
                device_id,
                device_deleted: false,
                device: Some(device),
                outcome,
            });
        }

        match self.devices.delete_if_depleted(device_id).await {
            Ok(true) => {
                counter!("stock_ledger.devices.cascade_deleted", 1);
                info!(%device_id, %devicelog_id, "movement reversed, depleted device deleted");
                self.publish(Event::DeviceDeleted {
                    device_id,
                    cascade: true,
                })
                .await;
                Ok(ReversedMovement {
                    devicelog_id,
                    device_id,
                    device_deleted: true,
                    device: None,
                    outcome: outcome.succeeded(LedgerStep::DeviceDelete),
                })
            }
            Ok(false) => {
                // Replenished (or removed) by a concurrent request in between.
                let current = match self.devices.find(device_id).await {
                    Ok(device) => device,
                    Err(e) => {
                        warn!(%device_id, error = %e, "failed to re-read device after skipped cascade");
                        None
                    }
                };
                info!(%device_id, %devicelog_id, "device no longer depleted, cascade skipped");
                Ok(ReversedMovement {
                    devicelog_id,
                    device_id,
                    device_deleted: false,
                    device: current,
                    outcome,
                })
            }
            Err(source) => {
                counter!("stock_ledger.partial_failures", 1);
                error!(%device_id, %devicelog_id, error = %source, "cascade deletion of depleted device failed");
                Err(LedgerError::CascadeDeleteFailed {
                    outcome: outcome.failed(LedgerStep::DeviceDelete),
                    source,
                })
            }
        }
    }

    /// Author of a log entry, for ownership decisions made by the access gate.
    pub async fn log_author(&self, devicelog_id: Uuid) -> Result<String, LedgerError> {
        self.find_log(devicelog_id).await.map(|log| log.author_id)
    }

    /// Edits provenance fields only; the ledger is unaffected.
    #[instrument(skip(self, update))]
    pub async fn update_provenance(
        &self,
        devicelog_id: Uuid,
        update: ProvenanceUpdate,
    ) -> Result<device_log::Model, LedgerError> {
        update.validate()?;
        let log = self
            .logs
            .update_provenance(devicelog_id, update)
            .await
            .map_err(|source| LedgerError::LogWriteFailed {
                outcome: LedgerOutcome::default().failed(LedgerStep::LogUpdate),
                source,
            })?
            .ok_or_else(|| LedgerError::NotFound(format!("Device log {} not found", devicelog_id)))?;
        info!(%devicelog_id, "device log provenance updated");
        Ok(log)
    }

    /// Edits descriptive fields only; quantities are never touched here.
    #[instrument(skip(self, details))]
    pub async fn update_device_details(
        &self,
        device_id: Uuid,
        details: DeviceDetailsUpdate,
    ) -> Result<device::Model, LedgerError> {
        details.validate()?;
        let device = self
            .devices
            .update_details(device_id, details)
            .await
            .map_err(|source| LedgerError::AggregateWriteFailed {
                outcome: LedgerOutcome::default().failed(LedgerStep::DeviceUpdate),
                source,
            })?
            .ok_or_else(|| LedgerError::NotFound(format!("Device {} not found", device_id)))?;
        info!(%device_id, "device details updated");
        Ok(device)
    }

    /// Deletes a device directly. Its log entries are left in place.
    #[instrument(skip(self))]
    pub async fn retire_device(&self, device_id: Uuid) -> Result<(), LedgerError> {
        let deleted = self
            .devices
            .delete(device_id)
            .await
            .map_err(|source| LedgerError::AggregateWriteFailed {
                outcome: LedgerOutcome::default().failed(LedgerStep::DeviceDelete),
                source,
            })?;
        if !deleted {
            return Err(LedgerError::NotFound(format!("Device {} not found", device_id)));
        }
        warn!(%device_id, "device retired directly; remaining logs are orphaned");
        self.publish(Event::DeviceDeleted {
            device_id,
            cascade: false,
        })
        .await;
        Ok(())
    }

    pub async fn get_device_with_history(
        &self,
        device_id: Uuid,
    ) -> Result<DeviceWithHistory, LedgerError> {
        let device = self
            .devices
            .find(device_id)
            .await
            .map_err(read_failure)?
            .ok_or_else(|| LedgerError::NotFound(format!("Device {} not found", device_id)))?;
        let device_logs = self
            .logs
            .find_by_device(device_id)
            .await
            .map_err(read_failure)?;
        Ok(DeviceWithHistory {
            device,
            device_logs,
        })
    }

    pub async fn get_log_with_device(
        &self,
        devicelog_id: Uuid,
    ) -> Result<LogWithDevice, LedgerError> {
        let log = self.find_log(devicelog_id).await?;
        let device = self
            .devices
            .find(log.device_id)
            .await
            .map_err(read_failure)?;
        Ok(LogWithDevice { log, device })
    }

    pub async fn list_devices(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<device::Model>, LedgerError> {
        self.devices.list(page, limit).await.map_err(read_failure)
    }

    pub async fn list_logs(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<device_log::Model>, LedgerError> {
        self.logs.list(page, limit).await.map_err(read_failure)
    }

    async fn find_log(&self, devicelog_id: Uuid) -> Result<device_log::Model, LedgerError> {
        self.logs
            .find(devicelog_id)
            .await
            .map_err(read_failure)?
            .ok_or_else(|| LedgerError::NotFound(format!("Device log {} not found", devicelog_id)))
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to publish ledger event");
            }
        }
    }
}

fn aggregate_failure(failed: LedgerStep, skipped: LedgerStep, source: DbErr) -> LedgerError {
    error!(error = %source, step = ?failed, "device aggregate write failed");
    LedgerError::AggregateWriteFailed {
        outcome: LedgerOutcome::default().failed(failed).skipped(skipped),
        source,
    }
}

fn read_failure(source: DbErr) -> LedgerError {
    error!(error = %source, "ledger read failed");
    LedgerError::StoreRead(source)
}
