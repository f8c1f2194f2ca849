//! Finishing order resolution.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::tournament::{Registration, RegistrationId};

/// A registration's resolved finishing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub registration_id: RegistrationId,
    /// 1-indexed, unique within the tournament
    pub position: u32,
}

/// Order two registrations by finish, better finish first.
///
/// Active players beat eliminated ones and keep their input order. Among
/// eliminated players a later elimination is a better finish; identical
/// timestamps fall back to the recorded elimination sequence, then to the
/// registration id.
pub fn compare_finish(a: &Registration, b: &Registration) -> Ordering {
    match (a.is_eliminated, b.is_eliminated) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => {
            // None sorts below Some, so reversing puts untimed eliminations last
            b.elimination_time
                .cmp(&a.elimination_time)
                .then_with(|| b.elimination_seq.cmp(&a.elimination_seq))
                .then_with(|| a.id.cmp(&b.id))
        }
    }
}

/// Rank registrations into positions `1..=n` with no gaps or ties
pub fn rank(registrations: &[Registration]) -> Vec<RankedEntry> {
    let mut ordered: Vec<&Registration> = registrations.iter().collect();
    // Vec::sort_by is stable
    ordered.sort_by(|a, b| compare_finish(a, b));

    ordered
        .into_iter()
        .zip(1u32..)
        .map(|(registration, position)| RankedEntry {
            registration_id: registration.id,
            position,
        })
        .collect()
}
