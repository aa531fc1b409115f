//! Initial migration: users, subscriptions and their content items.

use sea_orm_migration::prelude::*;

/// `1970-01-01T00:00:00Z`, the "never synchronized" checkpoint.
const EPOCH_DEFAULT: &str = "'1970-01-01 00:00:00+00:00'";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_users(manager).await?;
        self.create_subscriptions(manager).await?;
        self.create_content_items(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContentItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_users(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Provider).string().not_null())
                    .col(ColumnDef::new(Users::ExternalId).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Checkpoint)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust(EPOCH_DEFAULT)),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_provider_external_id")
                    .table(Users::Table)
                    .col(Users::Provider)
                    .col(Users::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_checkpoint")
                    .table(Users::Table)
                    .col(Users::Checkpoint)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_subscriptions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::UserId).uuid().null())
                    .col(ColumnDef::new(Subscriptions::Provider).string().not_null())
                    .col(ColumnDef::new(Subscriptions::ExternalId).text().not_null())
                    .col(ColumnDef::new(Subscriptions::Name).string().not_null())
                    .col(ColumnDef::new(Subscriptions::Thumbnail).text().null())
                    .col(
                        ColumnDef::new(Subscriptions::Checkpoint)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust(EPOCH_DEFAULT)),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_user")
                            .from(Subscriptions::Table, Subscriptions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup key for subscriptions discovered through a user sync.
        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_user_provider_external_id")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .col(Subscriptions::Provider)
                    .col(Subscriptions::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_checkpoint")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::Checkpoint)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_content_items(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContentItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContentItems::SubscriptionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContentItems::Name).string().not_null())
                    .col(ColumnDef::new(ContentItems::Url).text().not_null())
                    .col(ColumnDef::new(ContentItems::Thumbnail).text().not_null())
                    .col(
                        ColumnDef::new(ContentItems::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContentItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_items_subscription")
                            .from(ContentItems::Table, ContentItems::SubscriptionId)
                            .to(Subscriptions::Table, Subscriptions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Dedup key: one item per canonical URL within a subscription.
        manager
            .create_index(
                Index::create()
                    .name("idx_content_items_subscription_url")
                    .table(ContentItems::Table)
                    .col(ContentItems::SubscriptionId)
                    .col(ContentItems::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_items_published")
                    .table(ContentItems::Table)
                    .col((ContentItems::PublishedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Provider,
    ExternalId,
    DisplayName,
    Checkpoint,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Provider,
    ExternalId,
    Name,
    Thumbnail,
    Checkpoint,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "content_items")]
enum ContentItems {
    Table,
    Id,
    SubscriptionId,
    Name,
    Url,
    Thumbnail,
    PublishedAt,
    CreatedAt,
}
