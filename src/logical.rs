//! Deps-verdict computation (spec.md §4.5): the single boolean a
//! waiter fiber computes once all of a vertex's predecessors have
//! completed, for each of the three join kinds.
//!
//! Grounded line-for-line on `internal/dag/walk.go::waitDeps`'s
//! `switch n.GetType()` block, including its asymmetry: ordinary
//! AND-join short-circuits on the first failing predecessor, while
//! `any`/`not` scan every predecessor so *all* failing ones get demoted
//! to warning, not just the first.

use crate::graph::{LogicalKind, VertexId};
use crate::types::{FailureLevel, Response};
use rustc_hash::FxHashMap;

/// Computes the deps-verdict for a vertex given its kind and its
/// predecessors' ids, mutating each non-passing predecessor's stored
/// [`Response`] failure level to `Warning` when the join demotes it
/// (`any`'s non-passing predecessors; `not`'s single passing
/// predecessor).
///
/// `responses` is mutated in place so the demotion is visible to the
/// pipeline's later error-aggregation pass, exactly as the original's
/// `resp.SetFailureLevel(starriver.FailureLevelWarning)` mutates the
/// shared `respMap` entry, not a local copy.
#[must_use]
pub fn deps_verdict(
    kind: Option<LogicalKind>,
    predecessors: &[VertexId],
    responses: &mut FxHashMap<VertexId, Response>,
) -> bool {
    match kind {
        None => ordinary_verdict(predecessors, responses),
        Some(LogicalKind::Any) => any_verdict(predecessors, responses),
        Some(LogicalKind::Not) => not_verdict(predecessors, responses),
    }
}

/// AND-join: pass iff every predecessor passed. Short-circuits on the
/// first failure (no demotion — an ordinary vertex's failing
/// predecessor keeps its true failure level).
fn ordinary_verdict(predecessors: &[VertexId], responses: &FxHashMap<VertexId, Response>) -> bool {
    predecessors.iter().all(|p| responses.get(p).is_none_or(|r| r.pass))
}

/// OR-join: pass iff at least one predecessor passed. Every
/// non-passing predecessor is demoted to `Warning` so it isn't counted
/// as a pipeline error once it's been "salvaged" by the `any`.
fn any_verdict(predecessors: &[VertexId], responses: &mut FxHashMap<VertexId, Response>) -> bool {
    let mut any_passed = false;
    for p in predecessors {
        if let Some(resp) = responses.get_mut(p) {
            if resp.pass {
                any_passed = true;
            } else {
                resp.demote_to_warning();
            }
        }
    }
    any_passed
}

/// Negation: exactly one predecessor; pass iff it did not pass. The
/// predecessor's failure level is demoted to `Warning` regardless of
/// which way the negation landed, mirroring the original's
/// unconditional `resp.SetFailureLevel` in the `NodeTypeNot` arm.
fn not_verdict(predecessors: &[VertexId], responses: &mut FxHashMap<VertexId, Response>) -> bool {
    let Some(only) = predecessors.first() else {
        return true;
    };
    match responses.get_mut(only) {
        Some(resp) => {
            let passed = resp.pass;
            resp.demote_to_warning();
            !passed
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaskError;

    fn map(entries: Vec<(&str, Response)>) -> FxHashMap<VertexId, Response> {
        entries.into_iter().map(|(id, r)| (VertexId::new(id), r)).collect()
    }

    #[test]
    fn ordinary_join_requires_all_predecessors_to_pass() {
        let mut responses = map(vec![("a", Response::success()), ("b", Response::error(TaskError::Provider("x".into())))]);
        let preds = vec![VertexId::new("a"), VertexId::new("b")];
        assert!(!deps_verdict(None, &preds, &mut responses));
    }

    #[test]
    fn any_join_passes_with_one_success_and_demotes_the_rest() {
        let mut responses = map(vec![
            ("a", Response::success()),
            ("b", Response::error(TaskError::Provider("x".into()))),
        ]);
        let preds = vec![VertexId::new("a"), VertexId::new("b")];
        assert!(deps_verdict(Some(LogicalKind::Any), &preds, &mut responses));
        assert_eq!(responses[&VertexId::new("b")].failure_level, FailureLevel::Warning);
    }

    #[test]
    fn any_join_fails_when_no_predecessor_passes() {
        let mut responses = map(vec![("a", Response::error(TaskError::Provider("x".into())))]);
        let preds = vec![VertexId::new("a")];
        assert!(!deps_verdict(Some(LogicalKind::Any), &preds, &mut responses));
    }

    #[test]
    fn not_join_inverts_a_single_predecessor_and_demotes_it() {
        let mut responses = map(vec![("a", Response::error(TaskError::Provider("x".into())))]);
        let preds = vec![VertexId::new("a")];
        assert!(deps_verdict(Some(LogicalKind::Not), &preds, &mut responses));
        assert_eq!(responses[&VertexId::new("a")].failure_level, FailureLevel::Warning);
    }

    #[test]
    fn not_join_fails_when_predecessor_passed() {
        let mut responses = map(vec![("a", Response::success())]);
        let preds = vec![VertexId::new("a")];
        assert!(!deps_verdict(Some(LogicalKind::Not), &preds, &mut responses));
    }
}
