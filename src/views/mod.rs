//! Derived views: pure projections over the mirrored lists.
//!
//! Nothing here mutates state or touches the store; pages recompute these
//! from signals whenever an input changes.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::{Flashcard, Note, Task};

/// Sentinel folder meaning "no folder filter".
pub(crate) const ALL_FOLDERS: &str = "all";

/// The calendar always renders six full weeks.
pub(crate) const CALENDAR_CELLS: usize = 42;

/// Distinct non-empty trimmed folder labels, alphabetical, behind the `all`
/// sentinel.
pub(crate) fn folder_list(notes: &[Note]) -> Vec<String> {
    let mut folders: Vec<String> = notes
        .iter()
        .map(|n| n.folder.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    folders.sort();
    folders.dedup();

    let mut out = Vec::with_capacity(folders.len() + 1);
    out.push(ALL_FOLDERS.to_string());
    out.extend(folders);
    out
}

/// Folder + search filter, then pinned-first / most-recently-updated order.
/// Notes that were never updated sort as oldest.
pub(crate) fn visible_notes(notes: &[Note], folder: &str, search: &str) -> Vec<Note> {
    let needle = search.trim().to_lowercase();

    let mut out: Vec<Note> = notes
        .iter()
        .filter(|n| {
            if folder != ALL_FOLDERS && n.folder.trim() != folder {
                return false;
            }
            if needle.is_empty() {
                return true;
            }
            let haystack = format!("{}{}{}", n.title, n.folder, n.body).to_lowercase();
            haystack.contains(&needle)
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| {
        b.pinned.cmp(&a.pinned).then_with(|| {
            b.updated_at
                .unwrap_or(i64::MIN)
                .cmp(&a.updated_at.unwrap_or(i64::MIN))
        })
    });
    out
}

pub(crate) fn parse_due(due: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(due.trim(), "%Y-%m-%d").ok()
}

/// One pass over the task list; tasks without a parseable due date are
/// excluded from the calendar projection. Within a date, subscription order
/// is preserved.
pub(crate) fn tasks_by_date(tasks: &[Task]) -> HashMap<String, Vec<Task>> {
    let mut map: HashMap<String, Vec<Task>> = HashMap::new();
    for t in tasks {
        if parse_due(&t.due).is_none() {
            continue;
        }
        map.entry(t.due.clone()).or_default().push(t.clone());
    }
    map
}

/// Calendar dot color: amber while any task of the day is open.
pub(crate) fn day_has_open_tasks(tasks: &[Task]) -> bool {
    tasks.iter().any(|t| !t.done)
}

/// The full flashcard list, or only the cards back-referencing one note.
pub(crate) fn study_deck(cards: &[Flashcard], only_note: Option<&str>) -> Vec<Flashcard> {
    match only_note {
        Some(note_id) => cards
            .iter()
            .filter(|c| c.note_id.as_deref() == Some(note_id))
            .cloned()
            .collect(),
        None => cards.to_vec(),
    }
}

/// Exactly 42 cells starting from the Sunday on or before the 1st of the
/// month, so the grid always spans full weeks.
pub(crate) fn calendar_grid(month: NaiveDate) -> Vec<NaiveDate> {
    let first = month.with_day(1).unwrap_or(month);
    let offset = first.weekday().num_days_from_sunday() as i64;
    let start = first - Duration::days(offset);
    (0..CALENDAR_CELLS as i64)
        .map(|i| start + Duration::days(i))
        .collect()
}

pub(crate) fn prev_month(month: NaiveDate) -> NaiveDate {
    month.checked_sub_months(Months::new(1)).unwrap_or(month)
}

pub(crate) fn next_month(month: NaiveDate) -> NaiveDate {
    month.checked_add_months(Months::new(1)).unwrap_or(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, folder: &str, pinned: bool, updated_at: Option<i64>) -> Note {
        Note {
            id: id.to_string(),
            title: format!("title-{id}"),
            folder: folder.to_string(),
            body: format!("body of {id}"),
            pinned,
            created_at: Some(1),
            updated_at,
        }
    }

    fn task(id: &str, due: &str, done: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task-{id}"),
            folder: String::new(),
            due: due.to_string(),
            done,
            created_at: Some(1),
        }
    }

    fn card(id: &str, note_id: Option<&str>) -> Flashcard {
        Flashcard {
            id: id.to_string(),
            note_id: note_id.map(str::to_string),
            note_title: String::new(),
            question: "q".to_string(),
            answer: "a".to_string(),
            created_at: Some(1),
        }
    }

    #[test]
    fn folder_list_is_distinct_sorted_behind_sentinel() {
        let notes = vec![
            note("a", " math ", false, None),
            note("b", "bio", false, None),
            note("c", "math", false, None),
            note("d", "   ", false, None),
        ];
        assert_eq!(folder_list(&notes), vec!["all", "bio", "math"]);
    }

    #[test]
    fn folder_filter_returns_only_matching_notes() {
        let notes = vec![
            note("a", "math", false, None),
            note("b", "bio", false, None),
            note("c", " math", false, None),
        ];
        let out = visible_notes(&notes, "math", "");
        assert!(out.iter().all(|n| n.folder.trim() == "math"));
        assert_eq!(out.len(), 2);

        let all = visible_notes(&notes, ALL_FOLDERS, "");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn search_matches_title_folder_and_body_case_insensitive() {
        let mut n = note("a", "Chemistry", false, None);
        n.title = "Lecture 9".to_string();
        n.body = "Covalent BONDS".to_string();
        let notes = vec![n, note("b", "math", false, None)];

        assert_eq!(visible_notes(&notes, ALL_FOLDERS, "chemis").len(), 1);
        assert_eq!(visible_notes(&notes, ALL_FOLDERS, "bonds").len(), 1);
        assert_eq!(visible_notes(&notes, ALL_FOLDERS, "lecture 9").len(), 1);
        assert_eq!(visible_notes(&notes, ALL_FOLDERS, "nothing here").len(), 0);
    }

    #[test]
    fn pinned_notes_sort_first_then_update_time_descending() {
        let notes = vec![
            note("old", "", false, Some(10)),
            note("new", "", false, Some(30)),
            note("pinned-old", "", true, Some(5)),
            note("never", "", false, None),
        ];
        let out = visible_notes(&notes, ALL_FOLDERS, "");
        let ids: Vec<_> = out.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["pinned-old", "new", "old", "never"]);
    }

    #[test]
    fn tasks_by_date_is_exact() {
        let tasks = vec![
            task("a", "2026-03-02", false),
            task("b", "2026-03-02", true),
            task("c", "2026-03-05", false),
            task("d", "", false),
            task("e", "not-a-date", false),
        ];
        let map = tasks_by_date(&tasks);

        let march_2: Vec<_> = map["2026-03-02"].iter().map(|t| t.id.as_str()).collect();
        assert_eq!(march_2, vec!["a", "b"]);
        assert_eq!(map["2026-03-05"].len(), 1);
        assert_eq!(map.len(), 2);
        assert!(day_has_open_tasks(&map["2026-03-02"]));
        assert!(!day_has_open_tasks(&[task("x", "2026-03-02", true)]));
    }

    #[test]
    fn calendar_grid_is_42_cells_starting_sunday() {
        for (y, m) in [(2026, 1), (2026, 2), (2026, 8), (2024, 2), (2025, 12)] {
            let month = NaiveDate::from_ymd_opt(y, m, 1).unwrap();
            let grid = calendar_grid(month);

            assert_eq!(grid.len(), CALENDAR_CELLS);
            assert_eq!(grid[0].weekday(), chrono::Weekday::Sun);

            // Consecutive days.
            for w in grid.windows(2) {
                assert_eq!(w[1] - w[0], Duration::days(1));
            }

            // The 1st lands at its weekday index inside the first week.
            let idx = grid.iter().position(|d| *d == month).unwrap();
            assert_eq!(idx, month.weekday().num_days_from_sunday() as usize);
            assert!(idx < 7);
        }
    }

    #[test]
    fn calendar_grid_accepts_mid_month_reference() {
        let grid = calendar_grid(NaiveDate::from_ymd_opt(2026, 8, 19).unwrap());
        assert_eq!(grid, calendar_grid(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()));
    }

    #[test]
    fn month_navigation_roundtrip() {
        let aug = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(next_month(prev_month(aug)), aug);
        assert_eq!(prev_month(aug).month(), 7);
        assert_eq!(next_month(aug).month(), 9);
    }

    #[test]
    fn study_deck_filters_by_note_back_reference() {
        let cards = vec![card("1", Some("n1")), card("2", None), card("3", Some("n1"))];
        assert_eq!(study_deck(&cards, None).len(), 3);

        let only: Vec<_> = study_deck(&cards, Some("n1"))
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(only, vec!["1", "3"]);
    }
}
