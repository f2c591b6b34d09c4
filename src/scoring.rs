//! Scoring model for assignments.
//!
//! A single integer score ranks complete assignments. Every accepted
//! application earns points by priority, every collection left without
//! any accepted application costs a fixed penalty.
//!
//! | Priority | Points |
//! |----------|--------|
//! | 1 | 20 |
//! | 2 | 19 |
//! | ... | ... |
//! | 20 and above | 1 |
//!
//! Unassigned collection: [`UNASSIGNED_PENALTY`].

use std::collections::BTreeSet;

use crate::models::{Application, CollectionKey};

/// Points for a priority-1 application plus one.
const SCORE_BASE: i64 = 21;

/// Lowest number of points any accepted application earns.
pub const MIN_ASSIGNED_SCORE: i64 = 1;

/// Points for a collection that ends a trial with no accepted application.
pub const UNASSIGNED_PENALTY: i64 = -30;

/// Points for accepting an application with the given priority.
///
/// Lower priority values are preferred. Total over `u32`; priorities past
/// the cutoff all earn [`MIN_ASSIGNED_SCORE`].
///
/// # Example
/// ```
/// use u_assign::scoring::score_for_assigned;
///
/// assert_eq!(score_for_assigned(1), 20);
/// assert_eq!(score_for_assigned(2), 19);
/// assert_eq!(score_for_assigned(50), 1);
/// ```
#[inline]
pub fn score_for_assigned(priority: u32) -> i64 {
    (SCORE_BASE - i64::from(priority)).max(MIN_ASSIGNED_SCORE)
}

/// Penalty for one unassigned `(group, collection)`.
#[inline]
pub fn score_for_unassigned_collection() -> i64 {
    UNASSIGNED_PENALTY
}

/// Sum of [`score_for_assigned`] over accepted applications.
pub fn assigned_score<'a, I>(accepted: I) -> i64
where
    I: IntoIterator<Item = &'a Application>,
{
    accepted
        .into_iter()
        .map(|a| score_for_assigned(a.priority))
        .sum()
}

/// Total penalty for `unassigned` distinct open collections.
#[inline]
pub fn unassigned_penalty(unassigned: usize) -> i64 {
    score_for_unassigned_collection() * unassigned as i64
}

/// Upper bound on any reachable score.
///
/// Fixed acceptances keep their points; every open collection is counted
/// as if placed at priority 1.
pub fn max_score<'a, A, O>(accepted: A, open: O) -> i64
where
    A: IntoIterator<Item = &'a Application>,
    O: IntoIterator<Item = &'a Application>,
{
    let open_collections: BTreeSet<CollectionKey> =
        open.into_iter().map(Application::collection_key).collect();
    assigned_score(accepted) + score_for_assigned(1) * open_collections.len() as i64
}

/// Score of an assignment as it is stored.
///
/// `linked` are the applications persisted in some slot; every collection
/// of `applications` without a linked member is penalized once.
pub fn database_score<'a, L, A>(linked: L, applications: A) -> i64
where
    L: IntoIterator<Item = &'a Application>,
    A: IntoIterator<Item = &'a Application>,
{
    let mut handled = BTreeSet::new();
    let mut score = 0;
    for app in linked {
        handled.insert(app.collection_key());
        score += score_for_assigned(app.priority);
    }
    let unassigned = applications
        .into_iter()
        .map(Application::collection_key)
        .filter(|key| !handled.contains(key))
        .collect::<BTreeSet<_>>()
        .len();
    score + unassigned_penalty(unassigned)
}
