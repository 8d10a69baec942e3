use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CatalogCollections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogCollections::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatalogCollections::Kind).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatalogDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatalogDocuments::Collection)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CatalogDocuments::DocKey).string().not_null())
                    .col(ColumnDef::new(CatalogDocuments::Rev).string().not_null())
                    .col(ColumnDef::new(CatalogDocuments::FromId).string())
                    .col(ColumnDef::new(CatalogDocuments::ToId).string())
                    .col(ColumnDef::new(CatalogDocuments::Body).text().not_null())
                    .primary_key(
                        Index::create()
                            .col(CatalogDocuments::Collection)
                            .col(CatalogDocuments::DocKey),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_documents_from")
                    .table(CatalogDocuments::Table)
                    .col(CatalogDocuments::FromId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_catalog_documents_to")
                    .table(CatalogDocuments::Table)
                    .col(CatalogDocuments::ToId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CatalogDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatalogCollections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CatalogCollections {
    Table,
    Name,
    Kind,
}

#[derive(DeriveIden)]
enum CatalogDocuments {
    Table,
    Collection,
    DocKey,
    Rev,
    FromId,
    ToId,
    Body,
}
