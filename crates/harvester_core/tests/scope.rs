use harvester_core::{resolve_scope, ProgramIndexEntry, ScopeError, Selection};
use pretty_assertions::assert_eq;

fn index(ids: impl IntoIterator<Item = i64>) -> Vec<ProgramIndexEntry> {
    ids.into_iter()
        .map(|id| ProgramIndexEntry::new(id, format!("Program {id}")))
        .collect()
}

#[test]
fn window_selects_inclusive_bounds_in_index_order() {
    let idx = index([40, 25, 1, 50, 51, 30]);
    let scope = resolve_scope(&idx, Selection::window(Some(25), Some(50))).unwrap();
    assert_eq!(scope.ids().collect::<Vec<_>>(), vec![40, 25, 50, 30]);
}

#[test]
fn window_over_dense_index_selects_exactly_the_window() {
    let idx = index(1..=100);
    let scope = resolve_scope(&idx, Selection::window(Some(25), Some(50))).unwrap();
    assert_eq!(scope.ids().collect::<Vec<_>>(), (25..=50).collect::<Vec<_>>());
    assert!(scope.absent.is_empty());
    assert_eq!(scope.absent_count, 0);
}

#[test]
fn ids_outside_the_index_are_reported_not_fatal() {
    let idx = index([1, 2, 5]);
    let scope = resolve_scope(&idx, Selection::window(Some(1), Some(6))).unwrap();
    assert_eq!(scope.ids().collect::<Vec<_>>(), vec![1, 2, 5]);
    assert_eq!(scope.absent, vec![3, 4, 6]);
    assert_eq!(scope.absent_count, 3);
}

#[test]
fn wide_windows_count_absent_ids_without_listing() {
    let idx = index([1, 2]);
    let scope = resolve_scope(&idx, Selection::window(Some(1), Some(1_000_000))).unwrap();
    assert!(scope.absent.is_empty());
    assert_eq!(scope.absent_count, 999_998);
}

#[test]
fn missing_bounds_mean_full_index() {
    let idx = index([3, 1, 2]);
    let scope = resolve_scope(&idx, Selection::all()).unwrap();
    assert_eq!(scope.len(), 3);
    assert_eq!(scope.absent_count, 0);

    let scope = resolve_scope(&idx, Selection::window(None, Some(2))).unwrap();
    assert_eq!(scope.ids().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn explicit_ids_keep_index_order_and_report_unknown_once() {
    let idx = index([10, 20, 30]);
    let scope = resolve_scope(&idx, Selection::Ids(vec![30, 99, 10, 99])).unwrap();
    assert_eq!(scope.ids().collect::<Vec<_>>(), vec![10, 30]);
    assert_eq!(scope.absent, vec![99]);
    assert_eq!(scope.entry(30).unwrap().program_long_name, "Program 30");
}

#[test]
fn invalid_selections_are_rejected() {
    let idx = index([1]);
    assert_eq!(
        resolve_scope(&idx, Selection::window(Some(50), Some(25))).unwrap_err(),
        ScopeError::InvertedWindow { start: 50, end: 25 }
    );
    assert_eq!(
        resolve_scope(&idx, Selection::Ids(Vec::new())).unwrap_err(),
        ScopeError::EmptyIdList
    );
}
