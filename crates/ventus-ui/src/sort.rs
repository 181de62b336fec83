//! Client-side ordering of the materialized page.

use std::cmp::Ordering;

use ventus_services::{Issue, OptionMeta, SortDirection, SortKey};

/// Order by rank when both sides have one, ranked before unranked, then by
/// case-insensitive name.
pub fn compare_meta<M: OptionMeta + ?Sized>(a: &M, b: &M) -> Ordering {
    let by_rank = match (a.order(), b.order()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rank.then_with(|| compare_text(a.name(), b.name()))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Ascending comparison of two issues on one column.
pub fn compare_by(a: &Issue, b: &Issue, key: SortKey) -> Ordering {
    match key {
        SortKey::Type => compare_meta(&a.issue_type, &b.issue_type),
        SortKey::Severity => compare_meta(&a.severity, &b.severity),
        SortKey::Priority => compare_meta(&a.priority, &b.priority),
        SortKey::Status => compare_meta(&a.status, &b.status),
        SortKey::Title => compare_text(&a.title, &b.title),
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Modified => a.updated_at.cmp(&b.updated_at),
    }
}

/// Stable in-place sort; equal items keep their relative order, so sorting
/// twice is the same as sorting once.
pub fn sort_issues(items: &mut [Issue], key: SortKey, direction: SortDirection) {
    items.sort_by(|a, b| {
        let ord = compare_by(a, b, key);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Whether an edit touched the column the list is sorted by.
pub fn sort_field_changed(old: &Issue, new: &Issue, key: SortKey) -> bool {
    match key {
        SortKey::Type => old.issue_type != new.issue_type,
        SortKey::Severity => old.severity != new.severity,
        SortKey::Priority => old.priority != new.priority,
        SortKey::Status => old.status != new.status,
        SortKey::Title => old.title != new.title,
        SortKey::Id => old.id != new.id,
        SortKey::Modified => old.updated_at != new.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{issue, IssueFixture};

    fn ids(items: &[Issue]) -> Vec<i64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_sort_by_priority_rank() {
        let mut items = vec![
            issue(1, "a").with_priority(3, "High", Some(3)),
            issue(2, "b").with_priority(1, "Low", Some(1)),
            issue(3, "c").with_priority(2, "Normal", Some(2)),
        ];
        sort_issues(&mut items, SortKey::Priority, SortDirection::Ascending);
        assert_eq!(ids(&items), vec![2, 3, 1]);

        sort_issues(&mut items, SortKey::Priority, SortDirection::Descending);
        assert_eq!(ids(&items), vec![1, 3, 2]);
    }

    #[test]
    fn test_unranked_falls_back_to_name() {
        let mut items = vec![
            issue(1, "a").with_status(5, "zeta", None),
            issue(2, "b").with_status(6, "Alpha", None),
            issue(3, "c").with_status(7, "Mid", Some(1)),
        ];
        sort_issues(&mut items, SortKey::Status, SortDirection::Ascending);
        assert_eq!(ids(&items), vec![3, 2, 1]);
    }

    #[test]
    fn test_title_is_case_insensitive() {
        let mut items = vec![issue(1, "beta"), issue(2, "Alpha"), issue(3, "alpha two")];
        sort_issues(&mut items, SortKey::Title, SortDirection::Ascending);
        assert_eq!(ids(&items), vec![2, 3, 1]);
    }

    #[test]
    fn test_sort_is_idempotent_and_stable() {
        let mut items = vec![
            issue(4, "same"),
            issue(1, "Same"),
            issue(3, "other"),
            issue(2, "SAME"),
        ];
        sort_issues(&mut items, SortKey::Title, SortDirection::Descending);
        let once = ids(&items);
        sort_issues(&mut items, SortKey::Title, SortDirection::Descending);
        assert_eq!(ids(&items), once);
        // equal titles keep server order
        assert_eq!(once, vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_modified_uses_timestamp() {
        let mut items = vec![issue(1, "a").modified_at(30), issue(2, "b").modified_at(10)];
        sort_issues(&mut items, SortKey::Modified, SortDirection::Ascending);
        assert_eq!(ids(&items), vec![2, 1]);
    }

    #[test]
    fn test_sort_field_changed() {
        let old = issue(1, "a");
        let renamed = issue(1, "b");
        assert!(sort_field_changed(&old, &renamed, SortKey::Title));
        assert!(!sort_field_changed(&old, &renamed, SortKey::Priority));
    }
}
