//! Free-upload admission policy.
//!
//! Free notes are capped per uploader: never more than two outright, and once
//! an uploader has ten or more notes, free notes may not reach a fifth of
//! their total. Priced notes are never throttled.
//!
//! The server evaluates [`admit`] for an early rejection and re-applies the
//! same predicate inside the insert statement so concurrent uploads cannot
//! slip past it.

use serde::{Deserialize, Serialize};

/// Highest accepted price for a paid note.
pub const MAX_PRICE: i64 = 100;

/// Hard cap on free notes regardless of catalogue size.
pub const FREE_NOTE_CAP: i64 = 2;

/// Catalogue size at which the ratio clause starts to apply.
pub const RATIO_THRESHOLD: i64 = 10;

/// One free note allowed per this many notes once the ratio clause applies.
pub const RATIO_DIVISOR: i64 = 5;

/// Counts of an uploader's existing notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderTally {
    pub total: i64,
    pub free: i64,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    InvalidPrice,
    QuotaExceeded,
}

/// A price is either exactly 0 (free) or within `1..=100`.
pub const fn is_valid_price(price: i64) -> bool {
    price == 0 || (price >= 1 && price <= MAX_PRICE)
}

/// Whether another free note may be added on top of `tally`.
pub const fn admits_free_upload(tally: UploaderTally) -> bool {
    let over_cap = tally.free >= FREE_NOTE_CAP;
    let over_ratio =
        tally.total >= RATIO_THRESHOLD && tally.free >= tally.total / RATIO_DIVISOR;
    !(over_cap || over_ratio)
}

/// Decide whether an upload at `price` may proceed. Price validation runs
/// before the quota check.
pub const fn admit(tally: UploaderTally, price: i64) -> AdmissionDecision {
    if !is_valid_price(price) {
        return AdmissionDecision::InvalidPrice;
    }
    if price == 0 && !admits_free_upload(tally) {
        return AdmissionDecision::QuotaExceeded;
    }
    AdmissionDecision::Admit
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn tally(total: i64, free: i64) -> UploaderTally {
        UploaderTally { total, free }
    }

    fn with_upload(t: UploaderTally, price: i64) -> UploaderTally {
        tally(t.total + 1, t.free + i64::from(price == 0))
    }

    /// Most free notes reachable through sequential uploads at `total`.
    fn free_note_ceiling(total: i64) -> i64 {
        let ratio = total / RATIO_DIVISOR;
        ratio.max(FREE_NOTE_CAP)
    }

    #[test]
    fn price_bounds() {
        assert!(is_valid_price(0));
        assert!(is_valid_price(1));
        assert!(is_valid_price(100));
        assert!(!is_valid_price(101));
        assert!(!is_valid_price(-1));
        assert!(!is_valid_price(i64::MIN));
        assert!(!is_valid_price(i64::MAX));
    }

    #[test]
    fn price_validity_matches_definition() {
        for p in -500..=500 {
            assert_eq!(is_valid_price(p), p == 0 || (1..=100).contains(&p), "price {p}");
        }
    }

    #[test]
    fn new_uploader_gets_two_free_notes() {
        assert!(admits_free_upload(tally(0, 0)));
        assert!(admits_free_upload(tally(1, 1)));
        assert!(!admits_free_upload(tally(2, 2)));
    }

    #[test]
    fn cap_holds_even_with_many_paid_notes() {
        assert!(!admits_free_upload(tally(50, 2)));
        assert!(admits_free_upload(tally(50, 1)));
    }

    #[test]
    fn ratio_clause_applies_from_ten_notes() {
        // 10 notes, 1 free: ratio floor(10/5) = 2, 1 < 2, cap 1 < 2.
        assert!(admits_free_upload(tally(10, 1)));
        // 9 notes, 1 free: ratio clause inactive.
        assert!(admits_free_upload(tally(9, 1)));
        // 10 notes, 2 free: blocked by both clauses.
        assert!(!admits_free_upload(tally(10, 2)));
    }

    #[test]
    fn invalid_price_wins_over_quota() {
        assert_eq!(admit(tally(2, 2), 150), AdmissionDecision::InvalidPrice);
        assert_eq!(admit(tally(2, 2), -3), AdmissionDecision::InvalidPrice);
    }

    #[test]
    fn paid_uploads_bypass_quota() {
        assert_eq!(admit(tally(2, 2), 10), AdmissionDecision::Admit);
        assert_eq!(admit(tally(2, 2), 0), AdmissionDecision::QuotaExceeded);
    }

    /// Drive long deterministic sequences of upload attempts and check the
    /// free-note ceiling after every accepted upload.
    #[test]
    fn sequential_uploads_never_exceed_ceiling() {
        let mut seed: u64 = 0x5eed_1234_abcd_ef01;
        let mut next = move || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            seed >> 33
        };

        for _ in 0..200 {
            let mut current = UploaderTally::default();
            for _ in 0..60 {
                // Roughly half the attempts are free, the rest priced or invalid.
                let price = match next() % 4 {
                    0 | 1 => 0,
                    2 => i64::try_from(next() % 100).unwrap_or(0) + 1,
                    _ => 100 + i64::try_from(next() % 10).unwrap_or(0) + 1,
                };
                if admit(current, price) == AdmissionDecision::Admit {
                    current = with_upload(current, price);
                }
                assert!(
                    current.free <= free_note_ceiling(current.total),
                    "tally {current:?} exceeds ceiling"
                );
            }
        }
    }
}
