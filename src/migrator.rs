use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_directory_tables::Migration),
            Box::new(m20240201_000002_create_tenant_configurations_table::Migration),
            Box::new(m20240201_000003_create_inventory_tables::Migration),
            Box::new(m20240201_000004_create_stock_event_tables::Migration),
            Box::new(m20240201_000005_create_catalog_bridge_table::Migration),
            Box::new(m20240201_000006_create_transfer_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240201_000001_create_directory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_directory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Branches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Branches::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Branches::TenantId).uuid().not_null())
                        .col(ColumnDef::new(Branches::Name).string().not_null())
                        .col(
                            ColumnDef::new(Branches::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Branches::CreatedAt)
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
                        .name("idx_branches_tenant")
                        .table(Branches::Table)
                        .col(Branches::TenantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CatalogItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CatalogItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogItems::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(CatalogItems::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogItems::Name).string().not_null())
                        .col(
                            ColumnDef::new(CatalogItems::DefaultPrice)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CatalogItems::DefaultCost)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(CatalogItems::DefaultCode).string().null())
                        .col(
                            ColumnDef::new(CatalogItems::DefaultMinQuantity)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CatalogItems::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CatalogItems::CreatedAt)
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
                        .name("idx_catalog_items_tenant")
                        .table(CatalogItems::Table)
                        .col(CatalogItems::TenantId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CatalogItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Branches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Branches {
        Table,
        Id,
        TenantId,
        Name,
        Active,
        CreatedAt,
    }

    #[derive(Iden)]
    enum CatalogItems {
        Table,
        Id,
        TenantId,
        ItemType,
        Name,
        DefaultPrice,
        DefaultCost,
        DefaultCode,
        DefaultMinQuantity,
        Active,
        CreatedAt,
    }
}

mod m20240201_000002_create_tenant_configurations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_tenant_configurations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TenantConfigurations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TenantConfigurations::TenantId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::InventoryMode)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::CatalogMode)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::TransfersAllowed)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::TransferAutoConfirm)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::DefaultBranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TenantConfigurations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TenantConfigurations::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum TenantConfigurations {
        Table,
        TenantId,
        InventoryMode,
        CatalogMode,
        TransfersAllowed,
        TransferAutoConfirm,
        DefaultBranchId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000003_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BranchInventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BranchInventory::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BranchInventory::TenantId).uuid().not_null())
                        .col(ColumnDef::new(BranchInventory::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(BranchInventory::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BranchInventory::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(BranchInventory::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BranchInventory::MinQuantity)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(BranchInventory::UpdatedAt)
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
                        .name("uq_branch_inventory_key")
                        .table(BranchInventory::Table)
                        .col(BranchInventory::TenantId)
                        .col(BranchInventory::BranchId)
                        .col(BranchInventory::ItemType)
                        .col(BranchInventory::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(BusinessInventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BusinessInventory::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BusinessInventory::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BusinessInventory::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(BusinessInventory::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(BusinessInventory::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BusinessInventory::Reserved)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BusinessInventory::ResyncedAt)
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
                        .name("uq_business_inventory_key")
                        .table(BusinessInventory::Table)
                        .col(BusinessInventory::TenantId)
                        .col(BusinessInventory::ItemType)
                        .col(BusinessInventory::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BusinessInventory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(BranchInventory::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum BranchInventory {
        Table,
        Id,
        TenantId,
        BranchId,
        ItemType,
        ItemId,
        Quantity,
        MinQuantity,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum BusinessInventory {
        Table,
        Id,
        TenantId,
        ItemType,
        ItemId,
        Quantity,
        Reserved,
        ResyncedAt,
    }
}

mod m20240201_000004_create_stock_event_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000004_create_stock_event_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockEvents::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockEvents::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEvents::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockEvents::BranchId).uuid().null())
                        .col(
                            ColumnDef::new(StockEvents::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockEvents::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockEvents::Kind).string_len(16).not_null())
                        .col(
                            ColumnDef::new(StockEvents::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockEvents::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockEvents::Metadata).json().null())
                        .col(ColumnDef::new(StockEvents::ClaimedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockEvents::ClaimedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockEvents::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockEvents::ProcessedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Drain scans pending events in arrival order.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_events_pending")
                        .table(StockEvents::Table)
                        .col(StockEvents::ProcessedAt)
                        .col(StockEvents::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockLedger::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedger::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::TenantId).uuid().not_null())
                        .col(ColumnDef::new(StockLedger::BranchId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockLedger::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::ItemId).uuid().not_null())
                        .col(ColumnDef::new(StockLedger::Kind).string_len(16).not_null())
                        .col(
                            ColumnDef::new(StockLedger::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLedger::Delta)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::Context).string().not_null())
                        .col(ColumnDef::new(StockLedger::ReferenceId).uuid().null())
                        .col(ColumnDef::new(StockLedger::Metadata).json().null())
                        .col(
                            ColumnDef::new(StockLedger::AppliedAt)
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
                        .name("idx_stock_ledger_key")
                        .table(StockLedger::Table)
                        .col(StockLedger::TenantId)
                        .col(StockLedger::BranchId)
                        .col(StockLedger::ItemType)
                        .col(StockLedger::ItemId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedger::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockEvents::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockEvents {
        Table,
        Id,
        TenantId,
        BranchId,
        ItemType,
        ItemId,
        Kind,
        Quantity,
        ReferenceId,
        Metadata,
        ClaimedBy,
        ClaimedAt,
        CreatedAt,
        ProcessedAt,
    }

    #[derive(Iden)]
    enum StockLedger {
        Table,
        Id,
        TenantId,
        BranchId,
        ItemType,
        ItemId,
        Kind,
        Quantity,
        Delta,
        Context,
        ReferenceId,
        Metadata,
        AppliedAt,
    }
}

mod m20240201_000005_create_catalog_bridge_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000005_create_catalog_bridge_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CatalogBranchEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CatalogBranchEntries::Id)
                                .big_integer()
                                .primary_key()
                                .auto_increment()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::TenantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::BranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::Price)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::Cost)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::LocalCode)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::MinQuantity)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(CatalogBranchEntries::Status).string().null())
                        .col(
                            ColumnDef::new(CatalogBranchEntries::Visible)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogBranchEntries::UpdatedAt)
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
                        .name("uq_catalog_branch_entries_pair")
                        .table(CatalogBranchEntries::Table)
                        .col(CatalogBranchEntries::BranchId)
                        .col(CatalogBranchEntries::ItemType)
                        .col(CatalogBranchEntries::ItemId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_catalog_branch_entries_tenant_branch")
                        .table(CatalogBranchEntries::Table)
                        .col(CatalogBranchEntries::TenantId)
                        .col(CatalogBranchEntries::BranchId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CatalogBranchEntries::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CatalogBranchEntries {
        Table,
        Id,
        TenantId,
        BranchId,
        ItemType,
        ItemId,
        Price,
        Cost,
        LocalCode,
        MinQuantity,
        Status,
        Visible,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000006_create_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000006_create_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockTransfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::TenantId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockTransfers::OriginBranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::DestinationBranchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::CreatedBy).uuid().not_null())
                        .col(ColumnDef::new(StockTransfers::ApprovedBy).uuid().null())
                        .col(
                            ColumnDef::new(StockTransfers::SnapshotInventoryMode)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::SnapshotTransfersAllowed)
                                .boolean()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::SnapshotAutoConfirm)
                                .boolean()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransfers::Metadata).json().null())
                        .col(
                            ColumnDef::new(StockTransfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::ReceivedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockTransfers::CancelledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfers_tenant_status")
                        .table(StockTransfers::Table)
                        .col(StockTransfers::TenantId)
                        .col(StockTransfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockTransferLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockTransferLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::TransferId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::ItemType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::ItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockTransferLines::Quantity)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockTransferLines::Unit).string().null())
                        .col(ColumnDef::new(StockTransferLines::Lot).string().null())
                        .col(ColumnDef::new(StockTransferLines::Metadata).json().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_transfer_lines_transfer")
                                .from(StockTransferLines::Table, StockTransferLines::TransferId)
                                .to(StockTransfers::Table, StockTransfers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_transfer_lines_transfer")
                        .table(StockTransferLines::Table)
                        .col(StockTransferLines::TransferId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockTransferLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockTransfers {
        Table,
        Id,
        TenantId,
        OriginBranchId,
        DestinationBranchId,
        Status,
        CreatedBy,
        ApprovedBy,
        SnapshotInventoryMode,
        SnapshotTransfersAllowed,
        SnapshotAutoConfirm,
        Metadata,
        CreatedAt,
        ConfirmedAt,
        ReceivedAt,
        CancelledAt,
    }

    #[derive(Iden)]
    enum StockTransferLines {
        Table,
        Id,
        TransferId,
        ItemType,
        ItemId,
        Quantity,
        Unit,
        Lot,
        Metadata,
    }
}
