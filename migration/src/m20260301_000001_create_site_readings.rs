use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (sensor_id, time_bucket); the composite key is what makes
        // repeated cycles within the same hour a no-op.
        manager
            .create_table(
                Table::create()
                    .table(SiteReadings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SiteReadings::SensorId).integer().not_null())
                    .col(
                        ColumnDef::new(SiteReadings::TimeBucket)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SiteReadings::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(double_col(SiteReadings::GenerationKw))
                    .col(double_col(SiteReadings::LoadKw))
                    .col(double_col(SiteReadings::BatterySoc))
                    .col(double_col(SiteReadings::GridKw))
                    .col(double_col(SiteReadings::BatteryKw))
                    .col(double_col(SiteReadings::PvGeneratedKwh))
                    .col(double_col(SiteReadings::GridFeedInKwh))
                    .col(double_col(SiteReadings::HomeLoadKwh))
                    .col(double_col(SiteReadings::BatteryChargedKwh))
                    .col(double_col(SiteReadings::BatteryThroughputKwh))
                    .col(double_col(SiteReadings::GridImportKwh))
                    .col(double_col(SiteReadings::RawLoadKwh))
                    .col(double_col(SiteReadings::ChargingPileKwh))
                    .col(double_col(SiteReadings::DieselKwh))
                    .col(double_col(SiteReadings::SelfConsumptionPct))
                    .col(double_col(SiteReadings::SelfSufficiencyPct))
                    .col(double_col(SiteReadings::DischargedKwh))
                    .col(double_col(SiteReadings::GridChargeKwh))
                    .col(
                        ColumnDef::new(SiteReadings::HasChargingPile)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SiteReadings::GeneratorRan)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_site_readings_sensor_bucket")
                            .col(SiteReadings::SensorId)
                            .col(SiteReadings::TimeBucket),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_site_readings_recorded_at")
                    .table(SiteReadings::Table)
                    .col((SiteReadings::RecordedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SiteReadings::Table).to_owned())
            .await
    }
}

fn double_col(column: SiteReadings) -> ColumnDef {
    ColumnDef::new(column)
        .double()
        .not_null()
        .default(0.0)
        .to_owned()
}

#[derive(Iden)]
enum SiteReadings {
    Table,
    SensorId,
    TimeBucket,
    RecordedAt,
    GenerationKw,
    LoadKw,
    BatterySoc,
    GridKw,
    BatteryKw,
    PvGeneratedKwh,
    GridFeedInKwh,
    HomeLoadKwh,
    BatteryChargedKwh,
    BatteryThroughputKwh,
    GridImportKwh,
    RawLoadKwh,
    ChargingPileKwh,
    DieselKwh,
    SelfConsumptionPct,
    SelfSufficiencyPct,
    DischargedKwh,
    GridChargeKwh,
    HasChargingPile,
    GeneratorRan,
}
