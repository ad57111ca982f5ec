use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_devices_table::Migration),
            Box::new(m20240101_000002_create_device_logs_table::Migration),
        ]
    }
}

mod m20240101_000001_create_devices_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_devices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Devices::DeviceId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Devices::Name).string().not_null())
                        .col(ColumnDef::new(Devices::Type).string().not_null())
                        .col(ColumnDef::new(Devices::Description).text().null())
                        .col(ColumnDef::new(Devices::Image).string().null())
                        .col(
                            ColumnDef::new(Devices::QtyAvailable)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Devices::QtyPurchased)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Devices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Devices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_name")
                        .table(Devices::Table)
                        .col(Devices::Name)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Devices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Devices {
        Table,
        DeviceId,
        Name,
        Type,
        Description,
        Image,
        QtyAvailable,
        QtyPurchased,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_device_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_device_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key on device_id: a log may briefly outlive its device
            // after a cascade deletion.
            manager
                .create_table(
                    Table::create()
                        .table(DeviceLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeviceLogs::DevicelogId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeviceLogs::DeviceId).uuid().not_null())
                        .col(ColumnDef::new(DeviceLogs::Mode).string().not_null())
                        .col(ColumnDef::new(DeviceLogs::Qty).big_integer().not_null())
                        .col(ColumnDef::new(DeviceLogs::Price).decimal_len(16, 4).null())
                        .col(ColumnDef::new(DeviceLogs::Vendor).string().null())
                        .col(
                            ColumnDef::new(DeviceLogs::DateOfPurchase)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeviceLogs::AuthorId).string().not_null())
                        .col(ColumnDef::new(DeviceLogs::Remarks).text().null())
                        .col(
                            ColumnDef::new(DeviceLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeviceLogs::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_device_logs_device_id")
                        .table(DeviceLogs::Table)
                        .col(DeviceLogs::DeviceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_device_logs_author_id")
                        .table(DeviceLogs::Table)
                        .col(DeviceLogs::AuthorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeviceLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeviceLogs {
        Table,
        DevicelogId,
        DeviceId,
        Mode,
        Qty,
        Price,
        Vendor,
        DateOfPurchase,
        AuthorId,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }
}
