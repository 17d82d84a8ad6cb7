//! End-to-end pipeline tests against a real PostgreSQL instance
//!
//! Each test provisions its own database via `#[sqlx::test]` and drives a
//! job from submission to a terminal state. They are ignored by default so
//! the suite passes without a local PostgreSQL; run them with
//! `cargo test -- --ignored` and a reachable DATABASE_URL.

use sqlx::PgPool;
use uuid::Uuid;

use kodepos_server::features::imports::commands::create_job::{self, CreateImportJobCommand};
use kodepos_server::features::imports::pipeline::runner::{self, RunJobError};
use kodepos_server::features::imports::types::{
    ContentType, DuplicateStrategy, ImportConfiguration, ImportJob, JobStatus,
};

fn valid_record(code: i32, village: &str) -> serde_json::Value {
    serde_json::json!({
        "code": code,
        "village": village,
        "district": "Gambir",
        "regency": "Jakarta Pusat",
        "province": "DKI Jakarta",
        "latitude": -6.17,
        "longitude": 106.82
    })
}

async fn create_test_job(
    pool: &PgPool,
    content_type: ContentType,
    configuration: ImportConfiguration,
) -> ImportJob {
    let command = CreateImportJobCommand {
        filename: "dataset.json".to_string(),
        file_size: 1024,
        content_type,
        configuration,
        created_by: Some("tests".to_string()),
    };
    create_job::handle(pool.clone(), command).await.unwrap()
}

async fn seed_postal_code(pool: &PgPool, code: i32, village: &str) {
    sqlx::query(
        r#"
        INSERT INTO postal_codes (code, village, district, regency, province, latitude, longitude)
        VALUES ($1, $2, 'Gambir', 'Jakarta Pusat', 'DKI Jakarta', -6.17, 106.82)
        "#,
    )
    .bind(code)
    .bind(village)
    .execute(pool)
    .await
    .unwrap();
}

async fn village_of(pool: &PgPool, code: i32) -> String {
    sqlx::query_scalar("SELECT village FROM postal_codes WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_clean_import_completes(pool: PgPool) {
    let job = create_test_job(&pool, ContentType::Json, ImportConfiguration::default()).await;
    let content =
        serde_json::json!([valid_record(10110, "Gambir"), valid_record(10120, "Kebon Kelapa")])
            .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_records, 2);
    assert_eq!(job.processed_records, 2);
    assert_eq!(job.successful_records, 2);
    assert_eq!(job.failed_records, 0);
    assert_eq!(job.duplicate_records, 0);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.processing_time_ms.is_some());
    assert_eq!(village_of(&pool, 10110).await, "Gambir");

    let phases: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT processing_phase FROM import_statistics WHERE job_id = $1",
    )
    .bind(job.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    for phase in ["validation", "transformation", "insertion", "completion"] {
        assert!(phases.iter().any(|p| p == phase), "missing {} phase", phase);
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_duplicate_skip_counts_without_writing(pool: PgPool) {
    seed_postal_code(&pool, 10110, "Original").await;
    let job = create_test_job(&pool, ContentType::Json, ImportConfiguration::default()).await;
    let content = serde_json::json!([valid_record(10110, "Replacement")]).to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.duplicate_records, 1);
    assert_eq!(job.successful_records, 0);
    assert_eq!(village_of(&pool, 10110).await, "Original");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_duplicate_update_overwrites(pool: PgPool) {
    seed_postal_code(&pool, 10110, "Original").await;
    let config = ImportConfiguration {
        duplicate_strategy: DuplicateStrategy::Update,
        ..Default::default()
    };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content = serde_json::json!([valid_record(10110, "Replacement")]).to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.successful_records, 1);
    assert_eq!(job.duplicate_records, 0);
    assert_eq!(village_of(&pool, 10110).await, "Replacement");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_duplicate_error_fails_the_record_only(pool: PgPool) {
    seed_postal_code(&pool, 10110, "Original").await;
    let config = ImportConfiguration {
        duplicate_strategy: DuplicateStrategy::Error,
        ..Default::default()
    };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content =
        serde_json::json!([valid_record(10110, "Replacement"), valid_record(10120, "New")])
            .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.failed_records, 1);
    assert_eq!(job.successful_records, 1);
    assert_eq!(village_of(&pool, 10110).await, "Original");
    assert_eq!(village_of(&pool, 10120).await, "New");

    let failure_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM import_validation_results WHERE job_id = $1",
    )
    .bind(job.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(failure_rows, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_repeated_code_in_one_payload_fails_second_record(pool: PgPool) {
    // Neither code exists when the batch is resolved, so both rows resolve
    // to inserts and the second only discovers the duplicate at the
    // constraint, the same way a concurrent writer would.
    let config = ImportConfiguration {
        duplicate_strategy: DuplicateStrategy::Error,
        ..Default::default()
    };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content =
        serde_json::json!([valid_record(10110, "First"), valid_record(10110, "Second")])
            .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.successful_records, 1);
    assert_eq!(job.failed_records, 1);
    assert_eq!(job.duplicate_records, 0);
    assert_eq!(village_of(&pool, 10110).await, "First");

    // The losing record is kept in the audit trail, not just its reason.
    let (row_number, record_data): (i32, serde_json::Value) = sqlx::query_as(
        "SELECT row_number, record_data FROM import_validation_results WHERE job_id = $1",
    )
    .bind(job.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row_number, 2);
    assert_eq!(record_data["code"], serde_json::json!(10110));
    assert_eq!(record_data["village"], serde_json::json!("Second"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_cancel_during_insertion_stops_at_next_batch(pool: PgPool) {
    // Stand in for a cancel request landing mid-run: the first written
    // record flips the job to cancelled, exactly as the cancel endpoint
    // writes it. The driver must notice at the next batch boundary.
    sqlx::raw_sql(
        r#"
        CREATE FUNCTION cancel_running_import() RETURNS trigger AS $fn$
        BEGIN
            UPDATE import_jobs
            SET status = 'cancelled', completed_at = NOW(), updated_at = NOW()
            WHERE status = 'inserting';
            RETURN NEW;
        END;
        $fn$ LANGUAGE plpgsql;
        CREATE TRIGGER cancel_after_first_write AFTER INSERT ON postal_codes
        FOR EACH ROW EXECUTE FUNCTION cancel_running_import();
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let config = ImportConfiguration { batch_size: 1, ..Default::default() };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content = serde_json::json!([
        valid_record(10110, "A"),
        valid_record(10120, "B"),
        valid_record(10130, "C")
    ])
    .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    // The in-flight batch completed and its counters landed; nothing after
    // the cancellation was processed.
    assert_eq!(job.status, JobStatus::Cancelled);
    assert_eq!(job.total_records, 3);
    assert_eq!(job.processed_records, 1);
    assert_eq!(job.successful_records, 1);
    assert_eq!(job.failed_records, 0);
    assert!(job.completed_at.is_some());
    assert!(job.processing_time_ms.is_some());

    let written: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postal_codes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(written, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_invalid_record_fails_job_when_not_skipping(pool: PgPool) {
    let config = ImportConfiguration {
        skip_invalid_records: false,
        ..Default::default()
    };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content = serde_json::json!([
        valid_record(10110, "Gambir"),
        {"code": "not-a-code"}
    ])
    .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("failed validation"));
    assert!(job.completed_at.is_some());

    // Nothing was inserted; the job failed before the insertion phase.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postal_codes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_invalid_records_are_skipped_when_configured(pool: PgPool) {
    let job = create_test_job(&pool, ContentType::Json, ImportConfiguration::default()).await;
    let content = serde_json::json!([
        valid_record(10110, "Gambir"),
        {"code": 99, "village": "Nowhere"},
        valid_record(10120, "Kebon Kelapa")
    ])
    .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_records, 3);
    assert_eq!(job.processed_records, 3);
    assert_eq!(job.successful_records, 2);
    assert_eq!(job.failed_records, 1);

    let failures: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM import_validation_results WHERE job_id = $1",
    )
    .bind(job.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(failures, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_malformed_payload_fails_job(pool: PgPool) {
    let job = create_test_job(&pool, ContentType::Json, ImportConfiguration::default()).await;

    let job = runner::run_job(&pool, job.id, "{ not json at all").await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("Malformed payload"));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_csv_import_completes(pool: PgPool) {
    let job = create_test_job(&pool, ContentType::Csv, ImportConfiguration::default()).await;
    let content = "kodepos,kelurahan,kecamatan,kabupaten,provinsi,lat,lng\n\
                   10110,Gambir,Gambir,Jakarta Pusat,DKI Jakarta,-6.17,106.82\n";

    let job = runner::run_job(&pool, job.id, content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.successful_records, 1);
    assert_eq!(village_of(&pool, 10110).await, "Gambir");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_cancelled_job_cannot_be_started(pool: PgPool) {
    let job = create_test_job(&pool, ContentType::Json, ImportConfiguration::default()).await;
    sqlx::query("UPDATE import_jobs SET status = 'cancelled', completed_at = NOW() WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();

    let result = runner::run_job(&pool, job.id, "[]").await;
    assert!(matches!(
        result,
        Err(RunJobError::NotStartable(_, JobStatus::Cancelled))
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_missing_job_is_reported(pool: PgPool) {
    let result = runner::run_job(&pool, Uuid::new_v4(), "[]").await;
    assert!(matches!(result, Err(RunJobError::JobNotFound(_))));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostgreSQL instance"]
async fn test_single_record_batches_emit_one_stat_row_each(pool: PgPool) {
    let config = ImportConfiguration { batch_size: 1, ..Default::default() };
    let job = create_test_job(&pool, ContentType::Json, config).await;
    let content = serde_json::json!([
        valid_record(10110, "A"),
        valid_record(10120, "B"),
        valid_record(10130, "C")
    ])
    .to_string();

    let job = runner::run_job(&pool, job.id, &content).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    let insert_batches: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM import_statistics
        WHERE job_id = $1 AND processing_phase = 'insertion'
        "#,
    )
    .bind(job.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(insert_batches, 3);
}
