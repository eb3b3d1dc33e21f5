//! Selection of the daily review queue.

use chrono::{DateTime, Utc};

use crate::Flashcard;

/// Bounds on the daily review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyLimits {
    /// Most due cards taken into one session.
    pub due_limit: usize,
    /// Sessions shorter than this are topped up with cards that are not due.
    pub minimum_total: usize,
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            due_limit: 20,
            minimum_total: 10,
        }
    }
}

/// Pick the cards to present in today's session.
///
/// Up to `due_limit` due cards are taken in the order given. If that leaves
/// the session short of `minimum_total`, the remaining cards fill it up,
/// least recently reviewed first (never-reviewed cards count as oldest).
/// A short or empty result just means there is nothing more to review.
pub fn select_daily_set(
    cards: Vec<Flashcard>,
    now: DateTime<Utc>,
    limits: DailyLimits,
) -> Vec<Flashcard> {
    let (due, not_due): (Vec<_>, Vec<_>) = cards.into_iter().partition(|c| c.is_due(now));

    let mut due = due.into_iter();
    let mut selected: Vec<Flashcard> = due.by_ref().take(limits.due_limit).collect();
    if selected.len() >= limits.minimum_total {
        return selected;
    }

    // Due cards past the limit only show up here when due_limit < minimum_total.
    let mut backfill: Vec<Flashcard> = not_due.into_iter().chain(due).collect();
    backfill.sort_by_key(|c| c.last_reviewed);

    let wanted = limits.minimum_total - selected.len();
    selected.extend(backfill.into_iter().take(wanted));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Difficulty;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn card(id: i64, next_review: Option<DateTime<Utc>>, last_reviewed: Option<DateTime<Utc>>) -> Flashcard {
        let created = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        Flashcard {
            id,
            user_id: "u1".into(),
            note_id: None,
            question: format!("question {}", id),
            answer: format!("answer {}", id),
            subject: "biology".into(),
            difficulty: Difficulty::Medium,
            review_count: if last_reviewed.is_some() { 1 } else { 0 },
            last_reviewed,
            next_review,
            created_at: created,
            updated_at: created,
        }
    }

    fn due_card(id: i64) -> Flashcard {
        card(id, Some(now() - Duration::hours(1)), Some(now() - Duration::days(2)))
    }

    /// Not due; last reviewed `age_days` ago.
    fn later_card(id: i64, age_days: i64) -> Flashcard {
        card(id, Some(now() + Duration::days(3)), Some(now() - Duration::days(age_days)))
    }

    fn ids(cards: &[Flashcard]) -> Vec<i64> {
        cards.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_empty_collection() {
        assert!(select_daily_set(vec![], now(), DailyLimits::default()).is_empty());
    }

    #[test]
    fn test_caps_due_cards() {
        let cards: Vec<_> = (1..=25).map(due_card).collect();
        let selected = select_daily_set(cards, now(), DailyLimits::default());
        assert_eq!(selected.len(), 20);
        assert!(selected.iter().all(|c| c.is_due(now())));
        assert_eq!(ids(&selected), (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_enough_due_means_no_backfill() {
        let mut cards: Vec<_> = (1..=12).map(due_card).collect();
        cards.extend((100..110).map(|id| later_card(id, 30)));
        let selected = select_daily_set(cards, now(), DailyLimits::default());
        assert_eq!(ids(&selected), (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_backfills_oldest_first() {
        let mut cards: Vec<_> = (1..=3).map(due_card).collect();
        // 50 not-due cards, card 100 + k last reviewed k days ago.
        cards.extend((0..50).map(|k| later_card(100 + k, k)));
        let selected = select_daily_set(cards, now(), DailyLimits::default());

        assert_eq!(selected.len(), 10);
        assert_eq!(&ids(&selected)[..3], &[1, 2, 3]);
        assert_eq!(&ids(&selected)[3..], &[149, 148, 147, 146, 145, 144, 143]);
    }

    #[test]
    fn test_never_reviewed_backfill_first() {
        let cards = vec![
            later_card(1, 10),
            card(2, Some(now() + Duration::days(1)), None),
            later_card(3, 40),
        ];
        let limits = DailyLimits {
            due_limit: 20,
            minimum_total: 2,
        };
        let selected = select_daily_set(cards, now(), limits);
        assert_eq!(ids(&selected), vec![2, 3]);
    }

    #[test]
    fn test_unscheduled_card_is_due() {
        let cards = vec![later_card(1, 1), card(2, None, None)];
        let selected = select_daily_set(cards, now(), DailyLimits::default());
        assert_eq!(selected[0].id, 2);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_small_collection_returns_everything() {
        let cards = vec![due_card(1), later_card(2, 5), later_card(3, 9), due_card(4)];
        let selected = select_daily_set(cards, now(), DailyLimits::default());
        assert_eq!(ids(&selected), vec![1, 4, 3, 2]);
    }

    #[test]
    fn test_no_duplicates_and_bounded() {
        for due_count in [0usize, 5, 9, 10, 15, 30] {
            for later_count in [0usize, 4, 20] {
                let mut cards: Vec<_> = (0..due_count as i64).map(due_card).collect();
                cards.extend((0..later_count as i64).map(|k| later_card(1000 + k, k)));
                let total = cards.len();
                let selected = select_daily_set(cards, now(), DailyLimits::default());

                let unique: HashSet<_> = selected.iter().map(|c| c.id).collect();
                assert_eq!(unique.len(), selected.len());

                let expected = if due_count.min(20) >= 10 {
                    due_count.min(20)
                } else {
                    total.min(10)
                };
                assert_eq!(selected.len(), expected);
            }
        }
    }

    #[test]
    fn test_due_overflow_backfills_when_limit_below_minimum() {
        let cards: Vec<_> = (1..=8).map(due_card).collect();
        let limits = DailyLimits {
            due_limit: 5,
            minimum_total: 10,
        };
        let selected = select_daily_set(cards, now(), limits);
        assert_eq!(selected.len(), 8);
        assert_eq!(&ids(&selected)[..5], &[1, 2, 3, 4, 5]);
    }
}
