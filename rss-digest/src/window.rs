//! Trailing time-window filter.

use crate::types::{Entry, WINDOW_HOURS};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// True iff `published` lies in `[reference - 24h, reference]`.
pub fn in_window(published: Option<DateTime<Utc>>, reference: DateTime<Utc>) -> bool {
    match published {
        Some(ts) => ts >= reference - Duration::hours(WINDOW_HOURS) && ts <= reference,
        None => false,
    }
}

/// Keep entries published in the trailing window, preserving input order.
///
/// Entries without a usable timestamp count as out of window.
pub fn filter_recent(entries: Vec<Entry>, reference: DateTime<Utc>) -> Vec<Entry> {
    let before = entries.len();
    let kept: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| {
            let keep = in_window(entry.published, reference);
            if !keep && entry.published.is_none() {
                debug!("Excluding entry without timestamp: {}", entry.link);
            }
            keep
        })
        .collect();

    debug!("Window filter kept {}/{} entries", kept.len(), before);
    kept
}

/// Newest first; stable for equal timestamps.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.published.cmp(&a.published));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(link: &str, published: Option<DateTime<Utc>>) -> Entry {
        Entry {
            title: link.to_string(),
            link: link.to_string(),
            published,
            source_name: "s".to_string(),
            summary: None,
            full_content: None,
            categories: Vec::new(),
        }
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let r = reference();
        assert!(in_window(Some(r), r));
        assert!(in_window(Some(r - Duration::hours(24)), r));
        assert!(!in_window(Some(r - Duration::hours(24) - Duration::seconds(1)), r));
        assert!(!in_window(Some(r + Duration::seconds(1)), r));
    }

    #[test]
    fn missing_timestamps_are_excluded() {
        let r = reference();
        let kept = filter_recent(vec![entry("a", None), entry("b", Some(r - Duration::hours(1)))], r);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].link, "b");
    }

    #[test]
    fn relative_order_is_preserved() {
        let r = reference();
        let input = vec![
            entry("old", Some(r - Duration::hours(2))),
            entry("stale", Some(r - Duration::hours(30))),
            entry("new", Some(r - Duration::minutes(5))),
        ];
        let links: Vec<String> = filter_recent(input, r).into_iter().map(|e| e.link).collect();
        assert_eq!(links, vec!["old", "new"]);
    }

    #[test]
    fn sorting_puts_newest_first() {
        let r = reference();
        let mut entries = vec![
            entry("a", Some(r - Duration::hours(3))),
            entry("b", Some(r - Duration::hours(1))),
            entry("c", Some(r - Duration::hours(3))),
        ];
        sort_newest_first(&mut entries);
        let links: Vec<&str> = entries.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["b", "a", "c"]);
    }
}
