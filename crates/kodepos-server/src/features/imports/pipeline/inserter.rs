//! Batch insertion
//!
//! Writes one batch of resolved records and tallies the outcome. Data-level
//! failures (conflicts, records that lost a duplicate race) are counted and
//! reported per row; only infrastructure failures abort the batch.

use sqlx::PgPool;
use tracing::warn;

use crate::db::postal_codes::{self, PostalRecord};
use crate::features::imports::pipeline::resolver::ResolvedAction;
use crate::features::imports::types::DuplicateStrategy;

/// One record ready for writing, with its resolved action and the source
/// row it came from.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub row_number: i32,
    pub record: PostalRecord,
    pub action: ResolvedAction,
}

/// One record that could not be written, with the record itself kept for
/// the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    pub row_number: i32,
    pub record: PostalRecord,
    pub reason: String,
}

/// Tally of a completed batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchOutcome {
    pub inserted: i32,
    pub updated: i32,
    pub skipped_duplicates: i32,
    pub failed: i32,
    /// Failed records with their per-row reasons.
    pub failures: Vec<FailedRecord>,
}

impl BatchOutcome {
    /// Records written successfully (inserts plus updates).
    pub fn successful(&self) -> i32 {
        self.inserted + self.updated
    }

    fn fail(&mut self, resolved: &ResolvedRecord, reason: String) {
        self.failed += 1;
        self.failures.push(FailedRecord {
            row_number: resolved.row_number,
            record: resolved.record.clone(),
            reason,
        });
    }
}

/// Write one batch of resolved records.
///
/// A unique-constraint violation on insert means the duplicate check was
/// stale: another writer created the code between resolution and write.
/// The record is reclassified according to the duplicate strategy instead
/// of being treated as an error. Any other database failure aborts the
/// batch and bubbles up as infrastructure trouble.
pub async fn write_batch(
    pool: &PgPool,
    batch: &[ResolvedRecord],
    strategy: DuplicateStrategy,
) -> Result<BatchOutcome, sqlx::Error> {
    let mut outcome = BatchOutcome::default();

    for resolved in batch {
        let code = resolved.record.code;
        match resolved.action {
            ResolvedAction::Insert => {
                match postal_codes::insert_record(pool, &resolved.record).await {
                    Ok(()) => outcome.inserted += 1,
                    Err(e) if is_unique_violation(&e) => {
                        reclassify_race(pool, &mut outcome, resolved, strategy).await?;
                    },
                    Err(e) => return Err(e),
                }
            },
            ResolvedAction::Update => {
                if postal_codes::update_record(pool, &resolved.record).await? {
                    outcome.updated += 1;
                } else {
                    // Row vanished between the duplicate check and the
                    // update; retry as a fresh insert.
                    match postal_codes::insert_record(pool, &resolved.record).await {
                        Ok(()) => outcome.inserted += 1,
                        Err(e) if is_unique_violation(&e) => {
                            reclassify_race(pool, &mut outcome, resolved, strategy).await?;
                        },
                        Err(e) => return Err(e),
                    }
                }
            },
            ResolvedAction::Skip => outcome.skipped_duplicates += 1,
            ResolvedAction::Conflict => {
                outcome.fail(resolved, format!("postal code {} already exists", code));
            },
        }
    }

    Ok(outcome)
}

/// Handle a record whose insert lost the race to a concurrent writer.
async fn reclassify_race(
    pool: &PgPool,
    outcome: &mut BatchOutcome,
    resolved: &ResolvedRecord,
    strategy: DuplicateStrategy,
) -> Result<(), sqlx::Error> {
    let code = resolved.record.code;
    warn!(code, "duplicate check was stale; reclassifying by strategy");
    match strategy {
        DuplicateStrategy::Skip => outcome.skipped_duplicates += 1,
        DuplicateStrategy::Update => {
            if postal_codes::update_record(pool, &resolved.record).await? {
                outcome.updated += 1;
            } else {
                outcome.fail(
                    resolved,
                    format!("postal code {} changed concurrently and could not be updated", code),
                );
            }
        },
        DuplicateStrategy::Error => {
            outcome.fail(resolved, format!("postal code {} already exists", code));
        },
    }
    Ok(())
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}
