//! Relational storage engine on `sea-orm`.
//!
//! Every document is one row of `catalog_documents`, keyed by
//! `(collection, doc_key)`. User attributes are kept as a JSON text column;
//! edge endpoints get their own columns. Replace is a single `UPDATE`
//! filtered on the expected revision; update merges inside one transaction
//! that holds the row's write lock.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::entity::{collection, document};
use super::migrations::Migrator;
use super::shape;
use crate::config::redact_dsn;
use crate::domain::document::{Document, DocumentMeta, FROM, TO};
use crate::domain::engine::{CollectionKind, DocumentEngine, EngineError, EngineResult};

pub struct SeaOrmEngine {
    db: DatabaseConnection,
}

impl SeaOrmEngine {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a pool for `dsn` and applies pending migrations.
    ///
    /// In-memory `SQLite` databases are pinned to a single connection, since
    /// each connection would otherwise see its own empty database.
    ///
    /// # Errors
    /// Fails when the database is unreachable or a migration fails.
    pub async fn connect(dsn: &str, max_connections: Option<u32>) -> Result<Self, DbErr> {
        let mut opts = ConnectOptions::new(dsn.to_owned());
        opts.sqlx_logging(false);
        if dsn.contains(":memory:") {
            opts.max_connections(1).min_connections(1);
        } else if let Some(max) = max_connections {
            opts.max_connections(max);
        }

        let db = Database::connect(opts).await?;
        Migrator::up(&db, None).await?;
        info!(dsn = %redact_dsn(dsn), "Relational catalog storage ready");
        Ok(Self::new(db))
    }

    async fn kind_of(&self, name: &str) -> EngineResult<CollectionKind> {
        let row = collection::Entity::find_by_id(name.to_owned())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| EngineError::collection_not_found(name))?;
        CollectionKind::parse(&row.kind).ok_or_else(|| {
            EngineError::internal(format!("collection {name} has unknown kind '{}'", row.kind))
        })
    }

    async fn row(&self, collection: &str, key: &str) -> EngineResult<document::Model> {
        find_row(&self.db, collection, key).await
    }

    /// Explains a conditional write that matched no row.
    async fn missing_or_conflict(&self, collection: &str, key: &str) -> EngineError {
        match self.row(collection, key).await {
            Ok(_) => EngineError::conflict(collection, key),
            Err(err) => err,
        }
    }

    async fn insert(
        &self,
        collection: &str,
        mut body: Document,
        edge: Option<(String, String)>,
    ) -> EngineResult<DocumentMeta> {
        let key = shape::take_key(&mut body)?.unwrap_or_else(new_token);
        let rev = new_token();
        let (from_id, to_id) = edge.unzip();
        let model = document::ActiveModel {
            collection: ActiveValue::Set(collection.to_owned()),
            doc_key: ActiveValue::Set(key.clone()),
            rev: ActiveValue::Set(rev.clone()),
            body: ActiveValue::Set(encode_body(body, from_id.is_some())?),
            from_id: ActiveValue::Set(from_id),
            to_id: ActiveValue::Set(to_id),
        };

        if let Err(err) = document::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await
        {
            let duplicate = matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                || self.row(collection, &key).await.is_ok();
            return Err(if duplicate {
                EngineError::unique_constraint_violated(collection, &key)
            } else {
                db_error(err)
            });
        }
        debug!(collection, key = %key, "Inserted row");
        Ok(DocumentMeta::new(collection, key, rev))
    }
}

#[async_trait]
impl DocumentEngine for SeaOrmEngine {
    async fn ensure_collection(&self, name: &str, kind: CollectionKind) -> EngineResult<()> {
        let existing = collection::Entity::find_by_id(name.to_owned())
            .one(&self.db)
            .await
            .map_err(db_error)?;
        match existing {
            Some(row) if row.kind == kind.as_str() => Ok(()),
            Some(_) => Err(EngineError::collection_type_invalid(name, kind)),
            None => {
                let model = collection::ActiveModel {
                    name: ActiveValue::Set(name.to_owned()),
                    kind: ActiveValue::Set(kind.as_str().to_owned()),
                };
                collection::Entity::insert(model)
                    .exec_without_returning(&self.db)
                    .await
                    .map_err(db_error)?;
                info!(collection = name, kind = kind.as_str(), "Created collection");
                Ok(())
            }
        }
    }

    async fn all(&self, collection: &str) -> EngineResult<Vec<Document>> {
        self.kind_of(collection).await?;
        document::Entity::find()
            .filter(document::Column::Collection.eq(collection))
            .order_by_asc(document::Column::DocKey)
            .all(&self.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(to_document)
            .collect()
    }

    async fn save(&self, collection: &str, body: Document) -> EngineResult<DocumentMeta> {
        match self.kind_of(collection).await? {
            CollectionKind::Document => self.insert(collection, body, None).await,
            CollectionKind::Edge => {
                let edge = shape::endpoints(&body)?;
                self.insert(collection, body, Some(edge)).await
            }
        }
    }

    async fn save_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        body: Document,
    ) -> EngineResult<DocumentMeta> {
        if self.kind_of(collection).await? != CollectionKind::Edge {
            return Err(EngineError::collection_type_invalid(
                collection,
                CollectionKind::Edge,
            ));
        }
        let from = shape::check_handle(FROM, Some(&Value::from(from)))?;
        let to = shape::check_handle(TO, Some(&Value::from(to)))?;
        self.insert(collection, body, Some((from, to))).await
    }

    async fn document(&self, collection: &str, key: &str) -> EngineResult<Document> {
        self.kind_of(collection).await?;
        to_document(self.row(collection, key).await?)
    }

    async fn replace(
        &self,
        collection: &str,
        key: &str,
        body: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta> {
        let edge = self.kind_of(collection).await? == CollectionKind::Edge;
        let body = body.without_store_managed();
        let optional_handle = |field: &str| {
            body.get(field)
                .map(|value| shape::check_handle(field, Some(value)))
                .transpose()
        };
        let (from_id, to_id) = if edge {
            (optional_handle(FROM)?, optional_handle(TO)?)
        } else {
            (None, None)
        };

        let rev = new_token();
        let mut stmt = document::Entity::update_many()
            .col_expr(document::Column::Rev, Expr::value(rev.clone()))
            .col_expr(document::Column::Body, Expr::value(encode_body(body, edge)?))
            .filter(document::Column::Collection.eq(collection))
            .filter(document::Column::DocKey.eq(key));
        if let Some(from_id) = from_id {
            stmt = stmt.col_expr(document::Column::FromId, Expr::value(from_id));
        }
        if let Some(to_id) = to_id {
            stmt = stmt.col_expr(document::Column::ToId, Expr::value(to_id));
        }
        if let Some(expected) = if_match {
            stmt = stmt.filter(document::Column::Rev.eq(expected));
        }

        let result = stmt.exec(&self.db).await.map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(self.missing_or_conflict(collection, key).await);
        }
        Ok(DocumentMeta::new(collection, key, rev))
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta> {
        let edge = self.kind_of(collection).await? == CollectionKind::Edge;
        let txn = self.db.begin().await.map_err(db_error)?;

        // Take the row's write lock before reading it, so the merge below
        // starts from the last committed revision.
        let claimed = document::Entity::update_many()
            .col_expr(document::Column::Rev, Expr::col(document::Column::Rev).into())
            .filter(document::Column::Collection.eq(collection))
            .filter(document::Column::DocKey.eq(key))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        if claimed.rows_affected == 0 {
            return Err(EngineError::document_not_found(collection, key));
        }

        let row = find_row(&txn, collection, key).await?;
        if let Some(expected) = if_match
            && row.rev != expected
        {
            return Err(EngineError::conflict(collection, key));
        }

        let mut merged = to_document(row)?;
        merged.merge(patch.without_store_managed());
        let (from_id, to_id) = if edge {
            let (from, to) = shape::endpoints(&merged)?;
            (Some(from), Some(to))
        } else {
            (None, None)
        };

        let rev = new_token();
        document::Entity::update_many()
            .col_expr(document::Column::Rev, Expr::value(rev.clone()))
            .col_expr(
                document::Column::Body,
                Expr::value(encode_body(merged, edge)?),
            )
            .col_expr(document::Column::FromId, Expr::value(from_id))
            .col_expr(document::Column::ToId, Expr::value(to_id))
            .filter(document::Column::Collection.eq(collection))
            .filter(document::Column::DocKey.eq(key))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(DocumentMeta::new(collection, key, rev))
    }

    async fn remove(&self, collection: &str, key: &str) -> EngineResult<()> {
        self.kind_of(collection).await?;
        let result = document::Entity::delete_many()
            .filter(document::Column::Collection.eq(collection))
            .filter(document::Column::DocKey.eq(key))
            .exec(&self.db)
            .await
            .map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(EngineError::document_not_found(collection, key));
        }
        Ok(())
    }
}

async fn find_row<C: ConnectionTrait>(
    conn: &C,
    collection: &str,
    key: &str,
) -> EngineResult<document::Model> {
    document::Entity::find_by_id((collection.to_owned(), key.to_owned()))
        .one(conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| EngineError::document_not_found(collection, key))
}

fn new_token() -> String {
    Uuid::now_v7().simple().to_string()
}

fn db_error(err: DbErr) -> EngineError {
    EngineError::internal(err.to_string())
}

/// Serializes the user attributes of `body`. Edge endpoints live in their own
/// columns and are left out for edge collections.
fn encode_body(body: Document, edge: bool) -> EngineResult<String> {
    let mut body = body.without_store_managed();
    if edge {
        body.remove(FROM);
        body.remove(TO);
    }
    serde_json::to_string(&body).map_err(|err| EngineError::internal(err.to_string()))
}

fn to_document(row: document::Model) -> EngineResult<Document> {
    let corrupt = |reason: String| {
        EngineError::internal(format!(
            "stored body of {}/{} is unreadable: {reason}",
            row.collection, row.doc_key
        ))
    };
    let value: Value = serde_json::from_str(&row.body).map_err(|err| corrupt(err.to_string()))?;
    let mut doc =
        Document::from_value(value).ok_or_else(|| corrupt("not a JSON object".to_owned()))?;
    doc.apply_meta(&DocumentMeta::new(
        &row.collection,
        row.doc_key.clone(),
        row.rev.clone(),
    ));
    if let (Some(from), Some(to)) = (row.from_id, row.to_id) {
        doc.insert(FROM, from);
        doc.insert(TO, to);
    }
    Ok(doc)
}
