//! Membership resolution: which entities were index members during a window.
//!
//! Inclusion is computed by complement. An event is excluded when it
//! - ended before the window: `left_date <= start`, or
//! - began after the window: `joined_date >= end`.
//!
//! Everything not excluded is kept, then deduplicated by entity with the last
//! event in input order winning. A missing date never triggers an exclusion,
//! so open-ended spells survive any `start` bound.
//!
//! Two renditions share these rules: [`resolve`] over typed events and
//! [`resolve_frame`] over a polars `LazyFrame`.

use std::collections::HashMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::schema::MembershipColumns;
use crate::domain::{MembershipEvent, ObservationWindow};

/// What to do when an entity has more than one surviving event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the last event in input order.
    #[default]
    KeepLast,
    /// Collapse identical repeats, fail on repeats with different dates.
    RejectDivergent,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("entity '{entity_id}' has membership events with different dates")]
    DivergentDuplicates { entity_id: String },
}

/// True when the event ended at or before the window start.
fn ended_before(event: &MembershipEvent, window: &ObservationWindow) -> bool {
    match (event.left_date, window.start) {
        (Some(left), Some(start)) => left <= start,
        _ => false,
    }
}

/// True when the event began at or after the window end.
fn began_after(event: &MembershipEvent, window: &ObservationWindow) -> bool {
    match (event.joined_date, window.end) {
        (Some(joined), Some(end)) => joined >= end,
        _ => false,
    }
}

/// Events whose membership interval intersects the window, in input order.
pub fn filter_window(
    events: &[MembershipEvent],
    window: &ObservationWindow,
) -> Vec<MembershipEvent> {
    if window.is_unbounded() {
        return events.to_vec();
    }
    events
        .iter()
        .filter(|e| !ended_before(e, window) && !began_after(e, window))
        .cloned()
        .collect()
}

/// Index of the last event for every entity.
fn last_positions(events: &[MembershipEvent]) -> HashMap<&str, usize> {
    let mut last = HashMap::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        last.insert(event.entity_id.as_str(), i);
    }
    last
}

/// One event per entity, the last one in input order.
///
/// Survivors keep the relative order of their positions in `events`.
pub fn dedup_last(events: Vec<MembershipEvent>) -> Vec<MembershipEvent> {
    let keep: Vec<bool> = {
        let last = last_positions(&events);
        (0..events.len())
            .map(|i| last[events[i].entity_id.as_str()] == i)
            .collect()
    };
    events
        .into_iter()
        .zip(keep)
        .filter_map(|(event, kept)| kept.then_some(event))
        .collect()
}

/// Resolve membership for a window, keeping the last event per entity.
pub fn resolve(events: &[MembershipEvent], window: &ObservationWindow) -> Vec<MembershipEvent> {
    let in_window = filter_window(events, window);
    let resolved = dedup_last(in_window);
    tracing::debug!(
        input = events.len(),
        resolved = resolved.len(),
        %window,
        "resolved index membership"
    );
    resolved
}

/// Resolve membership under an explicit duplicate policy.
pub fn resolve_with(
    events: &[MembershipEvent],
    window: &ObservationWindow,
    policy: DuplicatePolicy,
) -> Result<Vec<MembershipEvent>, ResolveError> {
    if policy == DuplicatePolicy::RejectDivergent {
        let in_window = filter_window(events, window);
        let last = last_positions(&in_window);
        if let Some(divergent) = in_window
            .iter()
            .find(|e| !e.same_spell(&in_window[last[e.entity_id.as_str()]]))
        {
            return Err(ResolveError::DivergentDuplicates {
                entity_id: divergent.entity_id.clone(),
            });
        }
    }
    Ok(resolve(events, window))
}

// ── Frame rendition ─────────────────────────────────────────────────

/// Keep-predicate for a window, or `None` when the window is unbounded.
///
/// Null comparisons are filled with `false` so a missing date never excludes
/// a row.
fn window_predicate(window: &ObservationWindow, cols: &MembershipColumns) -> Option<Expr> {
    let ended_before = window.start.map(|start| {
        col(cols.left_date.as_str())
            .lt_eq(lit(start))
            .fill_null(lit(false))
    });
    let began_after = window.end.map(|end| {
        col(cols.joined_date.as_str())
            .gt_eq(lit(end))
            .fill_null(lit(false))
    });

    match (ended_before, began_after) {
        (Some(before), Some(after)) => Some(before.not().and(after.not())),
        (Some(before), None) => Some(before.not()),
        (None, Some(after)) => Some(after.not()),
        (None, None) => None,
    }
}

/// Rows whose membership interval intersects the window. Other columns pass
/// through untouched.
pub fn filter_window_frame(
    lf: LazyFrame,
    window: &ObservationWindow,
    cols: &MembershipColumns,
) -> LazyFrame {
    match window_predicate(window, cols) {
        Some(predicate) => lf.filter(predicate),
        None => lf,
    }
}

/// Frame counterpart of [`resolve`].
pub fn resolve_frame(
    lf: LazyFrame,
    window: &ObservationWindow,
    cols: &MembershipColumns,
) -> LazyFrame {
    filter_window_frame(lf, window, cols).unique_stable(
        Some(vec![cols.entity_id.as_str().into()]),
        UniqueKeepStrategy::Last,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ev(id: &str, joined: Option<NaiveDate>, left: Option<NaiveDate>) -> MembershipEvent {
        MembershipEvent::new(id, joined, left)
    }

    fn ids(events: &[MembershipEvent]) -> Vec<&str> {
        events.iter().map(|e| e.entity_id.as_str()).collect()
    }

    fn abc() -> Vec<MembershipEvent> {
        vec![
            ev("A", Some(d(2000, 1, 1)), Some(d(2010, 1, 1))),
            ev("B", Some(d(2005, 1, 1)), None),
            ev("C", Some(d(2011, 1, 1)), Some(d(2012, 1, 1))),
        ]
    }

    #[test]
    fn window_keeps_overlapping_and_open_ended() {
        let window = ObservationWindow::new(Some(d(2009, 1, 1)), Some(d(2010, 12, 31)));
        let resolved = resolve(&abc(), &window);
        assert_eq!(ids(&resolved), vec!["A", "B"]);
    }

    #[test]
    fn join_before_end_is_kept() {
        // C joins 2011-01-01, before the 2011-06-01 end.
        let window = ObservationWindow::new(Some(d(2009, 1, 1)), Some(d(2011, 6, 1)));
        let resolved = resolve(&abc(), &window);
        assert_eq!(ids(&resolved), vec!["A", "B", "C"]);
    }

    #[test]
    fn end_only_applies_join_rule() {
        let resolved = resolve(&abc(), &ObservationWindow::until(d(2004, 1, 1)));
        assert_eq!(ids(&resolved), vec!["A"]);
    }

    #[test]
    fn start_only_applies_exit_rule() {
        let resolved = resolve(&abc(), &ObservationWindow::since(d(2010, 6, 1)));
        assert_eq!(ids(&resolved), vec!["B", "C"]);
    }

    #[test]
    fn unbounded_returns_everything() {
        assert_eq!(filter_window(&abc(), &ObservationWindow::unbounded()), abc());
    }

    #[test]
    fn boundary_equality_excludes() {
        let events = vec![
            ev("LEFT_AT_START", Some(d(2000, 1, 1)), Some(d(2009, 1, 1))),
            ev("JOINED_AT_END", Some(d(2011, 6, 1)), None),
            ev("INSIDE", Some(d(2009, 1, 2)), Some(d(2011, 5, 31))),
        ];
        let window = ObservationWindow::new(Some(d(2009, 1, 1)), Some(d(2011, 6, 1)));
        assert_eq!(ids(&resolve(&events, &window)), vec!["INSIDE"]);
    }

    #[test]
    fn missing_join_date_is_never_excluded_by_end() {
        let events = vec![ev("X", None, Some(d(2020, 1, 1)))];
        let resolved = resolve(&events, &ObservationWindow::until(d(1990, 1, 1)));
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let resolved = resolve(&abc(), &ObservationWindow::since(d(2030, 1, 1)));
        assert_eq!(ids(&resolved), vec!["B"]);
        let resolved = resolve(&abc()[..1], &ObservationWindow::since(d(2030, 1, 1)));
        assert!(resolved.is_empty());
    }

    #[test]
    fn rejoin_keeps_last_spell() {
        let events = vec![
            ev("A", Some(d(1990, 1, 1)), Some(d(1995, 1, 1))),
            ev("B", Some(d(1990, 1, 1)), None),
            ev("A", Some(d(2000, 1, 1)), None),
        ];
        let resolved = resolve(&events, &ObservationWindow::unbounded());
        assert_eq!(ids(&resolved), vec!["B", "A"]);
        assert_eq!(resolved[1].joined_date, Some(d(2000, 1, 1)));
    }

    #[test]
    fn strict_policy_rejects_divergent_duplicates() {
        let events = vec![
            ev("A", Some(d(1990, 1, 1)), Some(d(1995, 1, 1))),
            ev("A", Some(d(2000, 1, 1)), None),
        ];
        let err = resolve_with(
            &events,
            &ObservationWindow::unbounded(),
            DuplicatePolicy::RejectDivergent,
        )
        .unwrap_err();
        assert_eq!(err, ResolveError::DivergentDuplicates { entity_id: "A".into() });
    }

    #[test]
    fn strict_policy_collapses_identical_repeats() {
        let events = vec![
            ev("A", Some(d(2000, 1, 1)), None),
            ev("A", Some(d(2000, 1, 1)), None),
        ];
        let resolved =
            resolve_with(&events, &ObservationWindow::unbounded(), DuplicatePolicy::RejectDivergent)
                .unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn strict_policy_only_checks_events_in_window() {
        // The old spell is outside the window, so the survivor is unambiguous.
        let events = vec![
            ev("A", Some(d(1990, 1, 1)), Some(d(1995, 1, 1))),
            ev("A", Some(d(2000, 1, 1)), None),
        ];
        let window = ObservationWindow::since(d(1999, 1, 1));
        let resolved = resolve_with(&events, &window, DuplicatePolicy::RejectDivergent).unwrap();
        assert_eq!(resolved, vec![ev("A", Some(d(2000, 1, 1)), None)]);
    }

    fn frame() -> DataFrame {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let dates = |v: &[Option<NaiveDate>]| {
            v.iter()
                .map(|d| d.map(|d| (d - epoch).num_days() as i32))
                .collect::<Vec<_>>()
        };
        let joined = dates(&[
            Some(d(2000, 1, 1)),
            Some(d(2005, 1, 1)),
            Some(d(2011, 1, 1)),
            Some(d(1990, 1, 1)),
        ]);
        let left = dates(&[Some(d(2010, 1, 1)), None, Some(d(2012, 1, 1)), Some(d(2009, 6, 1))]);
        DataFrame::new(vec![
            Column::new("gvkey".into(), &["A", "B", "C", "A"]),
            Column::new("from".into(), joined).cast(&DataType::Date).unwrap(),
            Column::new("thru".into(), left).cast(&DataType::Date).unwrap(),
            Column::new("tag".into(), &[1i32, 2, 3, 4]),
        ])
        .unwrap()
    }

    #[test]
    fn frame_keeps_null_exit_rows() {
        let window = ObservationWindow::new(Some(d(2009, 1, 1)), Some(d(2011, 1, 1)));
        let out = filter_window_frame(frame().lazy(), &window, &MembershipColumns::compustat())
            .collect()
            .unwrap();
        let tags: Vec<Option<i32>> =
            out.column("tag").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(tags, vec![Some(1), Some(2), Some(4)]);
    }

    #[test]
    fn frame_dedup_keeps_last_row() {
        let window = ObservationWindow::new(Some(d(2009, 1, 1)), Some(d(2011, 1, 1)));
        let out = resolve_frame(frame().lazy(), &window, &MembershipColumns::compustat())
            .collect()
            .unwrap();
        assert_eq!(out.height(), 2);
        let a = out
            .clone()
            .lazy()
            .filter(col("gvkey").eq(lit("A")))
            .collect()
            .unwrap();
        assert_eq!(a.column("tag").unwrap().i32().unwrap().get(0), Some(4));
    }

    #[test]
    fn frame_unbounded_is_identity_before_dedup() {
        let out = filter_window_frame(
            frame().lazy(),
            &ObservationWindow::unbounded(),
            &MembershipColumns::compustat(),
        )
        .collect()
        .unwrap();
        assert_eq!(out.height(), 4);
    }
}
