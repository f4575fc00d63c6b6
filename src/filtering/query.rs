use sea_orm::sea_query::IntoCondition;
use sea_orm::{Condition, EntityTrait, IdenStatic, Value};

use super::conditions::FieldFilter;
use super::sort::OrderBy;
use crate::base::display_value;

/// How a null simple-filter value is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// `filter_by(col, None)` compiles to `col IS NULL`.
    Strict,
    /// `filter_by(col, None)` is dropped, so optional query parameters can be passed as is.
    SkipNull,
}

/// Everything a read needs: filters, ordering and window.
///
/// ```rust,ignore
/// let args = CHILDREN
///     .query()
///     .filter_by(child::Column::ParentId, query.parent_id) // Option<Uuid>
///     .field(FieldFilter::new(child::Column::Title, query.title).operator(Operator::ILike))
///     .related_in("categories", category_ids)
///     .and_where(child::Column::Slug.ne("draft"))
///     .order_by(ORDERING.parse(query.order_by.as_deref())?)
///     .limit(10);
/// ```
#[derive(Debug, Clone)]
pub struct QueryArgs<E: EntityTrait> {
    filters: Vec<(E::Column, Value)>,
    related: Vec<(String, Vec<Value>)>,
    fields: Vec<FieldFilter>,
    condition: Condition,
    order_by: Option<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: bool,
}

impl<E: EntityTrait> Default for QueryArgs<E> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            related: Vec::new(),
            fields: Vec::new(),
            condition: Condition::all(),
            order_by: None,
            limit: None,
            offset: None,
            distinct: false,
        }
    }
}

impl<E: EntityTrait> QueryArgs<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality on a column of the managed entity. A null value (`None`) means `IS NULL`
    /// for strict reads and is dropped for `list`.
    #[must_use]
    pub fn filter_by(mut self, column: E::Column, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    /// Keeps rows linked to any of `values` through the reverse or many-to-many relation
    /// called `relation`. An empty list matches nothing.
    #[must_use]
    pub fn related_in<V, I>(mut self, relation: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.related
            .push((relation.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub fn field(mut self, filter: FieldFilter) -> Self {
        self.fields.push(filter);
        self
    }

    /// Arbitrary condition, ANDed with everything else.
    #[must_use]
    pub fn and_where(mut self, condition: impl IntoCondition) -> Self {
        self.condition = self.condition.add(condition.into_condition());
        self
    }

    /// Requested ordering; the manager's default ordering follows it.
    #[must_use]
    pub fn order_by(mut self, order_by: impl Into<Option<OrderBy>>) -> Self {
        self.order_by = order_by.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// `SELECT DISTINCT`, for joins that repeat rows.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// `slug=abc, parent_id=...` rendering of the simple filters, for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .filters
            .iter()
            .map(|(column, value)| format!("{}={}", column.as_str(), display_value(value)))
            .chain(self.related.iter().map(|(name, values)| {
                let values: Vec<String> = values.iter().map(display_value).collect();
                format!("{name}=[{}]", values.join(", "))
            }))
            .collect();
        if parts.is_empty() {
            "given filters".to_string()
        } else {
            parts.join(", ")
        }
    }

    pub(crate) fn filters(&self) -> &[(E::Column, Value)] {
        &self.filters
    }

    pub(crate) fn related(&self) -> &[(String, Vec<Value>)] {
        &self.related
    }

    pub(crate) fn fields(&self) -> &[FieldFilter] {
        &self.fields
    }

    pub(crate) fn condition(&self) -> &Condition {
        &self.condition
    }

    pub(crate) fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    pub(crate) fn window(&self) -> (Option<u64>, Option<u64>) {
        (self.limit, self.offset)
    }

    pub(crate) fn is_distinct(&self) -> bool {
        self.distinct
    }
}
