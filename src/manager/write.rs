use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait,
    DbErr, EntityTrait, IdenStatic, IntoActiveModel, Iterable, ModelTrait, QueryFilter, SqlErr,
    TransactionTrait, Value,
};

use super::ModelManager;
use crate::base::{Values, active_values, assign_id, model_values};
use crate::errors::ApiError;
use crate::meta::ManyToMany;

/// Target ids for many-to-many relations, keyed by relation name.
///
/// On create the links are added; on update the links of every named relation are replaced.
#[derive(Debug, Clone, Default)]
pub struct RelatedIds {
    ids: Vec<(String, Vec<Value>)>,
}

impl RelatedIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ids for `relation`, replacing any earlier call for the same name.
    #[must_use]
    pub fn set<V, I>(mut self, relation: impl Into<String>, ids: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let relation = relation.into();
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();
        match self.ids.iter_mut().find(|(name, _)| *name == relation) {
            Some(entry) => entry.1 = ids,
            None => self.ids.push((relation, ids)),
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.ids
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }
}

/// Rows a bulk update or delete applies to.
#[derive(Debug, Clone)]
pub enum BulkTarget {
    /// Primary key values; an empty list touches nothing.
    Ids(Vec<Value>),
    Condition(Condition),
}

impl BulkTarget {
    pub fn ids<V, I>(ids: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }
}

impl<E> ModelManager<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync,
    E::ActiveModel: ActiveModelBehavior + Send + Sync,
{
    // ============================================================================
    // Create
    // ============================================================================

    /// Validates and inserts one row, generating its UUID when unset.
    ///
    /// # Errors
    ///
    /// Returns a 422 error when validation fails, or the mapped database error.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        active: E::ActiveModel,
    ) -> Result<E::Model, ApiError> {
        self.create_with_related(db, active, RelatedIds::new()).await
    }

    /// [`create`](Self::create) plus junction rows for the given many-to-many ids.
    ///
    /// The row and its links are written in one transaction (a savepoint when `db` already
    /// is one).
    ///
    /// # Errors
    ///
    /// Returns a 422 error when validation fails, or the mapped database error.
    pub async fn create_with_related<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        mut active: E::ActiveModel,
        related: RelatedIds,
    ) -> Result<E::Model, ApiError> {
        assign_id(&mut active);
        let values = self.values_for_create(active_values(&active));
        self.run_db_validation(db, &values, None, &related).await?;

        let txn = db.begin().await?;
        let model = active.insert(&txn).await?;
        for (name, ids) in related.iter() {
            let link = self.link_or_422(name)?;
            self.insert_links(&txn, link, &model, ids).await?;
        }
        txn.commit().await?;
        tracing::debug!(table = %self.table_name, "Created row");
        Ok(model)
    }

    /// Validates every item, then inserts them in order.
    ///
    /// Returns the stored rows when `returning` is set.
    ///
    /// # Errors
    ///
    /// Returns a 422 error for the first item failing validation; nothing is inserted then.
    pub async fn bulk_create<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        items: Vec<E::ActiveModel>,
        returning: bool,
    ) -> Result<Option<Vec<E::Model>>, ApiError> {
        let mut prepared = Vec::with_capacity(items.len());
        for mut active in items {
            assign_id(&mut active);
            let values = self.values_for_create(active_values(&active));
            self.run_db_validation(db, &values, None, &RelatedIds::new())
                .await?;
            prepared.push(active);
        }

        let count = prepared.len();
        if !returning {
            if count > 0 {
                E::insert_many(prepared).exec_without_returning(db).await?;
            }
            tracing::debug!(table = %self.table_name, count, "Bulk created rows");
            return Ok(None);
        }

        let txn = db.begin().await?;
        let mut models = Vec::with_capacity(count);
        for active in prepared {
            models.push(active.insert(&txn).await?);
        }
        txn.commit().await?;
        tracing::debug!(table = %self.table_name, count, "Bulk created rows");
        Ok(Some(models))
    }

    // ============================================================================
    // Update
    // ============================================================================

    /// Applies the `Set` columns of `changes` to `existing` after validating the result.
    ///
    /// Returns `existing` untouched when `changes` sets nothing.
    ///
    /// # Errors
    ///
    /// Returns a 422 error when validation fails, or the mapped database error.
    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        existing: E::Model,
        changes: E::ActiveModel,
    ) -> Result<E::Model, ApiError> {
        self.update_with_related(db, existing, changes, RelatedIds::new())
            .await
    }

    /// [`update`](Self::update) that also replaces the links of every relation in `related`,
    /// in the same transaction as the row.
    ///
    /// # Errors
    ///
    /// Returns a 422 error when validation fails, or the mapped database error.
    pub async fn update_with_related<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        existing: E::Model,
        changes: E::ActiveModel,
        related: RelatedIds,
    ) -> Result<E::Model, ApiError> {
        let changed = set_values(&changes);
        let mut values = model_values(&existing);
        values.extend(changed.clone());
        self.run_db_validation(db, &values, Some(&existing), &related)
            .await?;

        let txn = db.begin().await?;
        let model = if changed.is_empty() {
            existing
        } else {
            let mut active = existing.into_active_model();
            for column in E::Column::iter() {
                if let ActiveValue::Set(value) = changes.get(column) {
                    active.set(column, value);
                }
            }
            active.update(&txn).await?
        };

        for (name, ids) in related.iter() {
            let link = self.link_or_422(name)?;
            self.delete_links(&txn, link, &model).await?;
            self.insert_links(&txn, link, &model, ids).await?;
        }
        txn.commit().await?;
        tracing::debug!(
            table = %self.table_name,
            columns = changed.len(),
            "Updated row"
        );
        Ok(model)
    }

    /// Sets the `Set` columns of `changes` on every targeted row, without validation.
    ///
    /// Returns the updated rows when `returning` is set.
    ///
    /// # Errors
    ///
    /// Returns the mapped database error.
    pub async fn bulk_update<C: ConnectionTrait>(
        &self,
        db: &C,
        changes: E::ActiveModel,
        target: BulkTarget,
        returning: bool,
    ) -> Result<Option<Vec<E::Model>>, ApiError> {
        let Some(condition) = self.target_condition(target)? else {
            return Ok(returning.then(Vec::new));
        };
        let pk = self.require_primary_key()?;

        // Updated rows are read back by key since the filter may no longer match them.
        let ids: Vec<Value> = if returning {
            E::find()
                .filter(condition.clone())
                .all(db)
                .await?
                .iter()
                .map(|model| model.get(pk))
                .collect()
        } else {
            Vec::new()
        };

        if !set_values(&changes).is_empty() {
            let result = E::update_many()
                .set(changes)
                .filter(condition)
                .exec(db)
                .await?;
            tracing::debug!(
                table = %self.table_name,
                rows = result.rows_affected,
                "Bulk updated rows"
            );
        }

        if !returning {
            return Ok(None);
        }
        if ids.is_empty() {
            return Ok(Some(Vec::new()));
        }
        Ok(Some(E::find().filter(pk.is_in(ids)).all(db).await?))
    }

    // ============================================================================
    // Delete
    // ============================================================================

    /// Deletes one row along with its junction rows; returns the deleted row.
    ///
    /// Links are only removed when the row is; a row still referenced through a foreign key
    /// keeps them.
    ///
    /// # Errors
    ///
    /// Returns a 422 error when other rows still reference the row, or the mapped database
    /// error.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        model: E::Model,
    ) -> Result<E::Model, ApiError> {
        let txn = db.begin().await?;
        for link in &self.many_to_many {
            self.delete_links(&txn, link, &model).await?;
        }
        model
            .clone()
            .into_active_model()
            .delete(&txn)
            .await
            .map_err(|err| self.delete_error(err))?;
        txn.commit().await?;
        tracing::debug!(table = %self.table_name, "Deleted row");
        Ok(model)
    }

    /// Deletes every targeted row with its junction rows; returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a 422 error when other rows still reference a targeted row, or the mapped
    /// database error. Nothing is deleted then.
    pub async fn bulk_delete<C: ConnectionTrait + TransactionTrait>(
        &self,
        db: &C,
        target: BulkTarget,
    ) -> Result<u64, ApiError> {
        let Some(condition) = self.target_condition(target)? else {
            return Ok(0);
        };

        let txn = db.begin().await?;
        let backend = txn.get_database_backend();
        for link in &self.many_to_many {
            let keys = Query::select()
                .column((self.table.clone(), link.local_column.clone()))
                .from(self.table.clone())
                .cond_where(condition.clone())
                .to_owned();
            let stmt = Query::delete()
                .from_table(link.junction.clone())
                .and_where(
                    Expr::col((link.junction.clone(), link.junction_local.clone()))
                        .in_subquery(keys),
                )
                .to_owned();
            txn.execute(backend.build(&stmt)).await?;
        }
        let result = E::delete_many()
            .filter(condition)
            .exec(&txn)
            .await
            .map_err(|err| self.delete_error(err))?;
        txn.commit().await?;
        tracing::debug!(
            table = %self.table_name,
            rows = result.rows_affected,
            "Bulk deleted rows"
        );
        Ok(result.rows_affected)
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Foreign key violations raised by a delete mean the row is still referenced.
    fn delete_error(&self, err: DbErr) -> ApiError {
        if matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
            tracing::debug!(
                error = ?err,
                table = %self.table_name,
                "Delete blocked by references"
            );
            return ApiError::unprocessable(format!(
                "{} is still referenced by other records.",
                self.table_name
            ));
        }
        err.into()
    }

    fn target_condition(&self, target: BulkTarget) -> Result<Option<Condition>, ApiError> {
        match target {
            BulkTarget::Ids(ids) if ids.is_empty() => Ok(None),
            BulkTarget::Ids(ids) => {
                let pk = self.require_primary_key()?;
                Ok(Some(Condition::all().add(pk.is_in(ids))))
            }
            BulkTarget::Condition(condition) => Ok(Some(condition)),
        }
    }

    async fn insert_links<C: ConnectionTrait>(
        &self,
        db: &C,
        link: &ManyToMany,
        model: &E::Model,
        ids: &[Value],
    ) -> Result<(), ApiError> {
        let mut unique: Vec<&Value> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Ok(());
        }

        let local = self.local_value(model, &link.local_column)?;
        let mut stmt = Query::insert();
        stmt.into_table(link.junction.clone())
            .columns([link.junction_local.clone(), link.junction_target.clone()]);
        for id in unique {
            stmt.values([local.clone().into(), id.clone().into()])
                .map_err(|e| {
                    ApiError::internal("Failed to build link insert", Some(e.to_string()))
                })?;
        }
        let backend = db.get_database_backend();
        db.execute(backend.build(&stmt)).await?;
        Ok(())
    }

    async fn delete_links<C: ConnectionTrait>(
        &self,
        db: &C,
        link: &ManyToMany,
        model: &E::Model,
    ) -> Result<(), ApiError> {
        let local = self.local_value(model, &link.local_column)?;
        let stmt = Query::delete()
            .from_table(link.junction.clone())
            .and_where(Expr::col((link.junction.clone(), link.junction_local.clone())).eq(local))
            .to_owned();
        let backend = db.get_database_backend();
        db.execute(backend.build(&stmt)).await?;
        Ok(())
    }
}

/// Columns explicitly `Set` on an active model.
fn set_values<A: ActiveModelTrait>(active: &A) -> Values {
    <A::Entity as EntityTrait>::Column::iter()
        .filter_map(|column| match active.get(column) {
            ActiveValue::Set(value) => Some((column.as_str().to_owned(), value)),
            _ => None,
        })
        .collect()
}
