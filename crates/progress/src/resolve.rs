//! Status resolution - the sequential unlock rule.

use buildboard_core::{Catalog, Gate, ProjectId, ResolvedStatus, UserProgress};

/// Resolve the status of `project_id` for a signed-in user.
///
/// Stored `completed`/`in_progress` is trusted as-is. Otherwise the first
/// step is unlocked, and any other step is unlocked only when the step
/// right before it is stored as completed. Ids outside the catalog are
/// locked.
pub fn resolve_status(
    catalog: &Catalog,
    progress: &UserProgress,
    project_id: &ProjectId,
) -> ResolvedStatus {
    let Some(project) = catalog.get(project_id) else {
        return ResolvedStatus::Derived(Gate::Locked);
    };

    if let Some(milestone) = progress.get(project_id).and_then(|e| e.status.milestone()) {
        return ResolvedStatus::Stored(milestone);
    }

    if project.is_first_step() {
        return ResolvedStatus::Derived(Gate::Unlocked);
    }

    let previous_done = catalog
        .previous(project)
        .and_then(|prev| progress.get(&prev.id))
        .is_some_and(|entry| entry.is_completed());

    if previous_done {
        ResolvedStatus::Derived(Gate::Unlocked)
    } else {
        ResolvedStatus::Derived(Gate::Locked)
    }
}

/// Resolve without a session: only the first step is open.
pub fn resolve_signed_out(catalog: &Catalog, project_id: &ProjectId) -> ResolvedStatus {
    match catalog.get(project_id) {
        Some(project) if project.is_first_step() => ResolvedStatus::Derived(Gate::Unlocked),
        _ => ResolvedStatus::Derived(Gate::Locked),
    }
}
