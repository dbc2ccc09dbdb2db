//! Keeps exactly one active profile per account that has any profiles.
//!
//! The planner is pure: it looks at a snapshot of `(id, is_active,
//! timestamps)` and decides which profile, if any, must be promoted. Writes
//! go through `ProfileRepository::activate`, which demotes and promotes in a
//! single step so readers never see two active profiles.

use std::cmp::Ordering;

use tracing::info;
use uuid::Uuid;

use crate::database::models::ActiveCandidate;
use crate::database::Store;
use crate::services::ServiceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveState {
    NoProfiles,
    OneActive(Uuid),
    ZeroActive,
    MultipleActive,
}

pub fn classify(candidates: &[ActiveCandidate]) -> ActiveState {
    if candidates.is_empty() {
        return ActiveState::NoProfiles;
    }
    let mut active = candidates.iter().filter(|c| c.is_active);
    match (active.next(), active.next()) {
        (None, _) => ActiveState::ZeroActive,
        (Some(only), None) => ActiveState::OneActive(only.id),
        (Some(_), Some(_)) => ActiveState::MultipleActive,
    }
}

/// Most recently updated first; ties fall to the newer row, then the id.
fn recency(a: &ActiveCandidate, b: &ActiveCandidate) -> Ordering {
    a.updated_at
        .cmp(&b.updated_at)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Profile to promote, or `None` when the set is already valid.
///
/// `prefer` wins when it names one of the candidates. With several active
/// rows the most recent active one is kept.
pub fn repair_target(candidates: &[ActiveCandidate], prefer: Option<Uuid>) -> Option<Uuid> {
    match classify(candidates) {
        ActiveState::NoProfiles | ActiveState::OneActive(_) => None,
        ActiveState::ZeroActive => {
            if let Some(id) = prefer.filter(|id| candidates.iter().any(|c| c.id == *id)) {
                return Some(id);
            }
            candidates.iter().max_by(|a, b| recency(a, b)).map(|c| c.id)
        }
        ActiveState::MultipleActive => {
            if let Some(id) = prefer.filter(|id| candidates.iter().any(|c| c.id == *id && c.is_active)) {
                return Some(id);
            }
            candidates
                .iter()
                .filter(|c| c.is_active)
                .max_by(|a, b| recency(a, b))
                .map(|c| c.id)
        }
    }
}

/// Repair the account's active flag if needed. Returns the promoted id.
/// Calling it on a valid state is a no-op.
pub async fn ensure_has_active_profile(
    store: &Store,
    account_id: &str,
    prefer: Option<Uuid>,
) -> ServiceResult<Option<Uuid>> {
    let candidates = store.profiles.active_candidates(account_id).await?;
    let Some(target) = repair_target(&candidates, prefer) else {
        return Ok(None);
    };

    info!(
        "Repairing active profile for account {} ({:?}), promoting {}",
        account_id,
        classify(&candidates),
        target
    );
    store.profiles.activate(account_id, target).await?;
    Ok(Some(target))
}
