//! Duplicate resolution
//!
//! Decides what to do with a record whose postal code may already exist,
//! according to the job's duplicate strategy. The existence check and the
//! eventual write are not atomic; the inserter reclassifies records that
//! lose the race to a concurrent writer.

use sqlx::PgPool;

use crate::db::postal_codes;
use crate::features::imports::types::DuplicateStrategy;

/// Action chosen for one record after the duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAction {
    /// No existing record; insert a new row.
    Insert,
    /// Existing record will be overwritten in place.
    Update,
    /// Existing record kept; the incoming one counts as a duplicate.
    Skip,
    /// Existing record makes the incoming one a hard failure.
    Conflict,
}

/// Pure strategy table, separated from the I/O so it can be tested directly.
pub fn decide_action(exists: bool, strategy: DuplicateStrategy) -> ResolvedAction {
    if !exists {
        return ResolvedAction::Insert;
    }
    match strategy {
        DuplicateStrategy::Skip => ResolvedAction::Skip,
        DuplicateStrategy::Update => ResolvedAction::Update,
        DuplicateStrategy::Error => ResolvedAction::Conflict,
    }
}

/// Check the database and decide the action for one postal code.
pub async fn resolve(
    pool: &PgPool,
    code: i32,
    strategy: DuplicateStrategy,
) -> Result<ResolvedAction, sqlx::Error> {
    let exists = postal_codes::code_exists(pool, code).await?;
    Ok(decide_action(exists, strategy))
}
