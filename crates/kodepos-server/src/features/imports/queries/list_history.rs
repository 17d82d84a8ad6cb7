use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::features::imports::types::{ImportJob, JobStatus};
use crate::features::shared::pagination::{
    sanitize_sort_field, Paginated, PaginationParams, SortDirection,
};

const SORTABLE_FIELDS: &[&str] =
    &["created_at", "completed_at", "status", "filename", "file_size", "total_records"];

/// Browse past and running import jobs, newest first by default.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListImportJobsQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,

    #[serde(default)]
    pub created_by: Option<String>,

    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sort_by: Option<String>,

    #[serde(default)]
    pub sort_direction: SortDirection,

    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, thiserror::Error)]
pub enum ListImportJobsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<Paginated<ImportJob>, ListImportJobsError>> for ListImportJobsQuery {}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListImportJobsQuery) {
    builder.push(" WHERE TRUE");
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(created_by) = &query.created_by {
        builder.push(" AND created_by = ").push_bind(created_by.clone());
    }
    if let Some(after) = query.created_after {
        builder.push(" AND created_at >= ").push_bind(after);
    }
    if let Some(before) = query.created_before {
        builder.push(" AND created_at <= ").push_bind(before);
    }
}

#[tracing::instrument(skip(pool, query), fields(page = ?query.pagination.page))]
pub async fn handle(
    pool: PgPool,
    query: ListImportJobsQuery,
) -> Result<Paginated<ImportJob>, ListImportJobsError> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM import_jobs");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&pool).await?;

    // Sort field passes through an allowlist before being interpolated.
    let sort_field = sanitize_sort_field(query.sort_by.as_deref(), SORTABLE_FIELDS, "created_at");

    let mut builder = QueryBuilder::new("SELECT * FROM import_jobs");
    push_filters(&mut builder, &query);
    builder.push(format!(" ORDER BY {} {}", sort_field, query.sort_direction.as_sql()));
    builder.push(" LIMIT ").push_bind(query.pagination.per_page());
    builder.push(" OFFSET ").push_bind(query.pagination.offset());

    let items: Vec<ImportJob> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Paginated::from_items(items, &query.pagination, total))
}
