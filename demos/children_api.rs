//! Parents and children served through [`ModelManager`]s.
//!
//! ```bash
//! cargo run --example children_api
//! ```
//!
//! Then visit:
//! - **API**: <http://localhost:3000/children>
//! - **OpenAPI**: <http://localhost:3000/openapi.json>
//!
//! `DATABASE_URL` selects the database (in-memory SQLite by default) and `RUST_LOG` the log
//! level.

use std::env;
use std::sync::LazyLock;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_sea_toolkit::base::base_table;
use axum_sea_toolkit::{
    ApiError, ErrorResponse, FieldFilter, ModelManager, Operator, OrderBy, OrderingFields, Page,
    PageParams, comma_list,
};
use sea_orm::sea_query::{ColumnDef, ForeignKey};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, IntoActiveModel};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use utoipa::{IntoParams, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use uuid::Uuid;

mod parent {
    use sea_orm::entity::prelude::*;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
    #[sea_orm(table_name = "parent")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub created_at: DateTimeUtc,
        pub title: String,
        #[sea_orm(unique)]
        pub slug: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::child::Entity")]
        Children,
    }

    impl Related<super::child::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Children.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

mod child {
    use axum_sea_toolkit::base::set_if_some;
    use sea_orm::IntoActiveModel;
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, ToSchema)]
    #[sea_orm(table_name = "child")]
    #[schema(as = Child)]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub created_at: chrono::DateTime<chrono::Utc>,
        pub title: String,
        #[sea_orm(unique)]
        pub slug: String,
        pub parent_id: Uuid,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::parent::Entity",
            from = "Column::ParentId",
            to = "super::parent::Column::Id"
        )]
        Parent,
    }

    impl Related<super::parent::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Parent.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}

    #[derive(Debug, Deserialize, ToSchema, DeriveIntoActiveModel)]
    pub struct ChildCreate {
        pub title: String,
        pub slug: String,
        pub parent_id: Uuid,
    }

    #[derive(Debug, Deserialize, ToSchema)]
    pub struct ChildUpdate {
        pub title: Option<String>,
        pub slug: Option<String>,
        pub parent_id: Option<Uuid>,
    }

    impl IntoActiveModel<ActiveModel> for ChildUpdate {
        fn into_active_model(self) -> ActiveModel {
            ActiveModel {
                title: set_if_some(self.title),
                slug: set_if_some(self.slug),
                parent_id: set_if_some(self.parent_id),
                ..Default::default()
            }
        }
    }
}

static CHILDREN: LazyLock<ModelManager<child::Entity>> = LazyLock::new(|| {
    ModelManager::new().with_default_ordering(OrderBy::asc(child::Column::Title))
});

static ORDERING: LazyLock<OrderingFields> = LazyLock::new(|| {
    OrderingFields::from_columns([child::Column::Title, child::Column::CreatedAt])
        .field("parent_title", parent::Column::Title)
});

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ChildFilters {
    /// Case-insensitive substring of the title
    title: Option<String>,
    /// Case-insensitive substring of the parent's title
    parent_title: Option<String>,
    /// Parent ids, separated by commas
    parent_id: Option<String>,
    /// `title`, `created_at` or `parent_title`, prefixed with `-` for descending order
    order_by: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    params(ChildFilters, PageParams),
    responses(
        (status = 200, body = Page<child::Model>),
        (status = 422, body = ErrorResponse)
    )
)]
async fn list_children(
    State(db): State<DatabaseConnection>,
    Query(filters): Query<ChildFilters>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let args = CHILDREN
        .query()
        .field(FieldFilter::new(child::Column::Title, filters.title).operator(Operator::ILike))
        .field(
            FieldFilter::new(parent::Column::Title, filters.parent_title)
                .operator(Operator::ILike),
        )
        .field(FieldFilter::any_of(
            child::Column::ParentId,
            comma_list::<Uuid>(filters.parent_id.as_deref())?,
        ))
        .order_by(ORDERING.parse(filters.order_by.as_deref())?);

    let page = CHILDREN.paginated_list(&db, args, params).await?;
    Ok((page.content_range("children"), Json(page)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Child id")),
    responses((status = 200, body = child::Model), (status = 404, body = ErrorResponse))
)]
async fn retrieve_child(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> Result<Json<child::Model>, ApiError> {
    let child = CHILDREN
        .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
        .await?;
    Ok(Json(child))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = child::ChildCreate,
    responses((status = 201, body = child::Model), (status = 422, body = ErrorResponse))
)]
async fn create_child(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<child::ChildCreate>,
) -> Result<(StatusCode, Json<child::Model>), ApiError> {
    let child = CHILDREN.create(&db, payload.into_active_model()).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Child id")),
    request_body = child::ChildUpdate,
    responses(
        (status = 200, body = child::Model),
        (status = 404, body = ErrorResponse),
        (status = 422, body = ErrorResponse)
    )
)]
async fn update_child(
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

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = Uuid, Path, description = "Child id")),
    responses((status = 204), (status = 404, body = ErrorResponse))
)]
async fn delete_child(
    State(db): State<DatabaseConnection>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = CHILDREN
        .get_or_404(&db, CHILDREN.query().filter_by(child::Column::Id, id))
        .await?;
    CHILDREN.delete(&db, existing).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_tables(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    let backend = db.get_database_backend();
    let parents = base_table(parent::Entity)
        .col(ColumnDef::new(parent::Column::Title).string().not_null())
        .col(ColumnDef::new(parent::Column::Slug).string().not_null().unique_key())
        .to_owned();
    let children = base_table(child::Entity)
        .col(ColumnDef::new(child::Column::Title).string().not_null())
        .col(ColumnDef::new(child::Column::Slug).string().not_null().unique_key())
        .col(ColumnDef::new(child::Column::ParentId).uuid().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(child::Entity, child::Column::ParentId)
                .to(parent::Entity, parent::Column::Id),
        )
        .to_owned();
    db.execute(backend.build(&parents)).await?;
    db.execute(backend.build(&children)).await?;
    Ok(())
}

#[derive(OpenApi)]
#[openapi()]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,axum_sea_toolkit=debug")),
        )
        .init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let db: DatabaseConnection = Database::connect(&database_url).await?;
    create_tables(&db).await?;

    let children = OpenApiRouter::new()
        .routes(routes!(list_children, create_child))
        .routes(routes!(retrieve_child, update_child, delete_child))
        .with_state(db);
    let (router, apidocs) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/children", children)
        .split_for_parts();
    let app = router.route(
        "/openapi.json",
        axum::routing::get(move || {
            let docs = apidocs.clone();
            async move { Json(docs) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("API: http://0.0.0.0:3000/children, OpenAPI: http://0.0.0.0:3000/openapi.json");
    axum::serve(listener, app).await?;
    Ok(())
}
