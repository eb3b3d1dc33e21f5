//! Review scheduling.
//!
//! Each review event bumps the card's review count and pushes its next
//! review out by a number of calendar days that depends on the rating:
//!
//! | rating | days until next review        |
//! |--------|-------------------------------|
//! | easy   | `max(1, review_count * 2)`    |
//! | medium | `max(1, review_count)`        |
//! | hard   | `1`                           |
//!
//! `review_count` is the value after the increment, so repeated easy or
//! medium reviews space out further while a hard rating starts over at a day.

use chrono::{DateTime, Days, TimeDelta, TimeZone, Utc};

use crate::{Difficulty, Flashcard};

/// Days until the next review for a rating, given the post-increment count.
pub fn interval_days(rating: Difficulty, review_count: u32) -> u32 {
    match rating {
        Difficulty::Easy => review_count.saturating_mul(2).max(1),
        Difficulty::Medium => review_count.max(1),
        Difficulty::Hard => 1,
    }
}

/// Advance `now` by `days` on the calendar of its own time zone.
///
/// The date component moves while the wall-clock time stays put, so a
/// review at 09:00 the day before a DST change is next due at 09:00. When
/// that wall-clock time does not exist or is ambiguous on the target day
/// the interval is taken as whole 24-hour periods instead. Intervals past
/// the end of the representable range saturate at its last instant.
pub fn next_review_after<Tz: TimeZone>(now: &DateTime<Tz>, days: u32) -> DateTime<Utc> {
    now.clone()
        .checked_add_days(Days::new(u64::from(days)))
        .or_else(|| now.clone().checked_add_signed(TimeDelta::try_days(i64::from(days))?))
        .map(|next| next.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Record one review of `card` rated `rating` at `now`.
///
/// Only `review_count`, `last_reviewed` and `next_review` change; the card's
/// own difficulty classification is left alone.
pub fn apply_review<Tz: TimeZone>(
    mut card: Flashcard,
    rating: Difficulty,
    now: &DateTime<Tz>,
) -> Flashcard {
    card.review_count = card.review_count.saturating_add(1);
    card.last_reviewed = Some(now.with_timezone(&Utc));
    card.next_review = Some(next_review_after(
        now,
        interval_days(rating, card.review_count),
    ));
    card
}
