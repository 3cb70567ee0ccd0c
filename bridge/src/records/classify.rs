//! Record type classification
//!
//! The vendor reports every access-log entry with an integer record type. Only
//! some of those types say anything about the bolt position; the rest (door
//! sensor, tamper alerts, parking-lock events, ...) carry no state signal.

/// What a record type means for the lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Unlock,
    Lock,
    Other,
}

use RecordAction::{Lock, Other, Unlock};

/// `(record type, action, description)`, sorted by record type
static RECORD_TYPES: &[(i64, RecordAction, &str)] = &[
    (1, Unlock, "unlock by app"),
    (4, Unlock, "unlock by passcode"),
    (5, Other, "Rise the lock (for parking lock)"),
    (6, Other, "Lower the lock (for parking lock)"),
    (7, Unlock, "unlock by IC card"),
    (8, Unlock, "unlock by fingerprint"),
    (9, Unlock, "unlock by wrist strap"),
    (10, Unlock, "unlock by Mechanical key"),
    (11, Lock, "lock by app"),
    (12, Unlock, "unlock by gateway"),
    (29, Other, "apply some force on the Lock"),
    (30, Other, "Door sensor closed"),
    (31, Other, "Door sensor open"),
    (32, Other, "open from inside"),
    (33, Lock, "lock by fingerprint"),
    (34, Lock, "lock by passcode"),
    (35, Lock, "lock by IC card"),
    (36, Lock, "lock by Mechanical key"),
    (37, Other, "Remote Control"),
    (42, Other, "received new local mail"),
    (43, Other, "received new other cities' mail"),
    (44, Other, "Tamper alert"),
    (45, Lock, "Auto Lock"),
    (46, Unlock, "unlock by unlock key"),
    (47, Lock, "lock by lock key"),
    (
        48,
        Lock,
        "System locked ( Caused by, for example: Using INVALID Passcode/Fingerprint/Card several times)",
    ),
    (49, Unlock, "unlock by hotel card"),
    (50, Unlock, "Unlocked due to the high temperature"),
    (52, Other, "Dead lock with APP"),
    (53, Other, "Dead lock with passcode"),
    (54, Other, "The car left (for parking lock)"),
    (55, Unlock, "unlock with key fob"),
    (57, Unlock, "Unlock with QR code success"),
    (58, Unlock, "Unlock with QR code failed, it's expired"),
    (59, Other, "Double locked"),
    (60, Other, "Cancel double lock"),
    (61, Lock, "Lock with QR code success"),
    (62, Lock, "Lock with QR code failed, the lock is double locked"),
    (63, Unlock, "Auto unlock at passage mode"),
];

fn lookup(code: i64) -> Option<&'static (i64, RecordAction, &'static str)> {
    RECORD_TYPES
        .binary_search_by_key(&code, |(c, _, _)| *c)
        .ok()
        .map(|idx| &RECORD_TYPES[idx])
}

/// Classify a record type. Unknown codes are `Other`.
pub fn classify(code: i64) -> RecordAction {
    lookup(code).map(|(_, action, _)| *action).unwrap_or(Other)
}

/// Human readable phrase for a record type, empty for unknown codes
pub fn describe(code: i64) -> &'static str {
    lookup(code).map(|(_, _, text)| *text).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNLOCK_CODES: [i64; 14] = [1, 4, 7, 8, 9, 10, 12, 46, 49, 50, 55, 57, 58, 63];
    const LOCK_CODES: [i64; 10] = [11, 33, 34, 35, 36, 45, 47, 48, 61, 62];

    #[test]
    fn test_table_is_sorted_and_unique() {
        assert!(RECORD_TYPES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_unlock_and_lock_sets() {
        for code in UNLOCK_CODES {
            assert_eq!(classify(code), RecordAction::Unlock, "code {}", code);
        }
        for code in LOCK_CODES {
            assert_eq!(classify(code), RecordAction::Lock, "code {}", code);
        }

        let signalling = RECORD_TYPES.iter().filter(|(_, a, _)| *a != Other).count();
        assert_eq!(signalling, UNLOCK_CODES.len() + LOCK_CODES.len());
    }

    #[test]
    fn test_classify_is_total() {
        for code in [-1, 0, 2, 3, 13, 28, 30, 44, 51, 56, 64, 1000, i64::MIN, i64::MAX] {
            assert_eq!(classify(code), RecordAction::Other, "code {}", code);
            assert_eq!(classify(code), classify(code));
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(1), "unlock by app");
        assert_eq!(describe(44), "Tamper alert");
        assert_eq!(describe(63), "Auto unlock at passage mode");
        assert_eq!(describe(2), "");
        assert_eq!(describe(-7), "");
    }
}
