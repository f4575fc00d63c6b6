use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Related};

use super::ModelManager;
use crate::errors::ApiError;
use crate::filtering::{FilterMode, Page, PageParams, QueryArgs};

impl<E> ModelManager<E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    /// First row matching `args`, nulls compared with `IS NULL`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<Option<E::Model>, ApiError> {
        Ok(self.select(&args, FilterMode::Strict)?.one(db).await?)
    }

    /// Like [`get`](Self::get) but a miss is a 404 naming the filters.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when no row matches.
    pub async fn get_or_404<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<E::Model, ApiError> {
        let description = args.describe();
        self.get(db, args).await?.ok_or_else(|| {
            ApiError::not_found(format!("{} with {description} not found", self.table_name))
        })
    }

    /// First row matching `args` together with its `R` row, loaded in the same query.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn get_with_related<R, C>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<Option<(E::Model, Option<R::Model>)>, ApiError>
    where
        R: EntityTrait,
        E: Related<R>,
        C: ConnectionTrait,
    {
        let related = R::default();
        let query = self.apply_args(
            E::find().find_also_related(related),
            &args,
            FilterMode::Strict,
            Some(related.table_name()),
        )?;
        Ok(query.one(db).await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn exists<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<bool, ApiError> {
        Ok(self.get(db, args).await?.is_some())
    }

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` when no row matches.
    pub async fn exists_or_404<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<(), ApiError> {
        let description = args.describe();
        if self.exists(db, args).await? {
            Ok(())
        } else {
            Err(ApiError::not_found(format!(
                "{} with {description} does not exist",
                self.table_name
            )))
        }
    }

    /// Rows matching `args`, nulls compared with `IS NULL`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn filter<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<Vec<E::Model>, ApiError> {
        Ok(self.select(&args, FilterMode::Strict)?.all(db).await?)
    }

    /// Rows matching `args`, skipping simple filters whose value is null.
    ///
    /// Meant for listing endpoints: every optional query parameter can be passed through.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn list<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<Vec<E::Model>, ApiError> {
        Ok(self.select(&args, FilterMode::SkipNull)?.all(db).await?)
    }

    /// [`list`](Self::list) with each row's `R` row.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn list_with_related<R, C>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<Vec<(E::Model, Option<R::Model>)>, ApiError>
    where
        R: EntityTrait,
        E: Related<R>,
        C: ConnectionTrait,
    {
        let related = R::default();
        let query = self.apply_args(
            E::find().find_also_related(related),
            &args,
            FilterMode::SkipNull,
            Some(related.table_name()),
        )?;
        Ok(query.all(db).await?)
    }

    /// One page of [`filter`](Self::filter).
    ///
    /// # Errors
    ///
    /// Returns a 422 error for invalid page parameters.
    pub async fn paginated_filter<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
        params: PageParams,
    ) -> Result<Page<E::Model>, ApiError> {
        self.paginate(db, &args, FilterMode::Strict, params).await
    }

    /// One page of [`list`](Self::list).
    ///
    /// # Errors
    ///
    /// Returns a 422 error for invalid page parameters.
    pub async fn paginated_list<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
        params: PageParams,
    ) -> Result<Page<E::Model>, ApiError> {
        self.paginate(db, &args, FilterMode::SkipNull, params).await
    }

    /// Number of rows matching `args`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Database` when the query fails.
    pub async fn count<C: ConnectionTrait>(
        &self,
        db: &C,
        args: QueryArgs<E>,
    ) -> Result<u64, ApiError> {
        let select = self.select(&args, FilterMode::Strict)?;
        Ok(PaginatorTrait::count(select, db).await?)
    }

    async fn paginate<C: ConnectionTrait>(
        &self,
        db: &C,
        args: &QueryArgs<E>,
        mode: FilterMode,
        params: PageParams,
    ) -> Result<Page<E::Model>, ApiError> {
        params.validate()?;
        let paginator = self.select(args, mode)?.paginate(db, params.size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(params.page - 1).await?;
        tracing::debug!(
            table = %self.table_name,
            page = params.page,
            size = params.size,
            total,
            "Fetched page"
        );
        Ok(Page::new(items, total, params))
    }
}
