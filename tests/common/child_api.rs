use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_sea_toolkit::{ApiError, FieldFilter, Operator, OrderingQuery, PageParams, comma_list};
use sea_orm::{DatabaseConnection, IntoActiveModel};
use serde::Deserialize;
use uuid::Uuid;

use super::entities::{child, parent};
use super::{CHILD_ORDERING, CHILDREN};

#[derive(Debug, Default, Deserialize)]
pub struct ChildFilters {
    pub title: Option<String>,
    pub parent_title: Option<String>,
    /// Comma separated parent ids
    pub parent_id: Option<String>,
}

pub async fn list_children(
    State(db): State<DatabaseConnection>,
    Query(filters): Query<ChildFilters>,
    Query(ordering): Query<OrderingQuery>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let parent_ids = comma_list::<Uuid>(filters.parent_id.as_deref())?;
    let args = CHILDREN
        .query()
        .field(FieldFilter::new(child::Column::Title, filters.title).operator(Operator::ILike))
        .field(
            FieldFilter::new(parent::Column::Title, filters.parent_title)
                .operator(Operator::ILike),
        )
        .field(FieldFilter::any_of(child::Column::ParentId, parent_ids))
        .order_by(CHILD_ORDERING.parse(ordering.order_by.as_deref())?);

    let page = CHILDREN.paginated_list(&db, args, params).await?;
    Ok((page.content_range("children"), Json(page)))
}

pub async fn retrieve_child(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> Result<Json<child::Model>, ApiError> {
    let child = CHILDREN
        .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
        .await?;
    Ok(Json(child))
}

pub async fn create_child(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<child::ChildCreate>,
) -> Result<(StatusCode, Json<child::Model>), ApiError> {
    let child = CHILDREN.create(&db, payload.into_active_model()).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

pub async fn update_child(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
    Json(payload): Json<child::ChildUpdate>,
) -> Result<Json<child::Model>, ApiError> {
    let existing = CHILDREN
        .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
        .await?;
    let child = CHILDREN
        .update(&db, existing, payload.into_active_model())
        .await?;
    Ok(Json(child))
}

pub async fn delete_child(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = CHILDREN
        .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
        .await?;
    CHILDREN.delete(&db, existing).await?;
    Ok(StatusCode::NO_CONTENT)
}
