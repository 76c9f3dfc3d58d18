//! Vesting engine: schedule validation and release arithmetic.
//!
//! Release amounts use cumulative-floor differencing: release `i` pays
//! `floor(W_i * total) - floor(W_{i-1} * total)` where `W_i` is the running
//! weight sum. The final running sum is exactly one, so the releases add up
//! to `total` with no dust left behind.

use super::decimal::Dec;
use super::entities::VestingQueueEntry;
use super::errors::FundraisingError;
use super::value_objects::{Timestamp, VestingSchedule};

/// Check that `schedules` is a valid partition of unity released after
/// `end_time`. An empty list is valid and means "release on settlement".
pub fn validate(schedules: &[VestingSchedule], end_time: Timestamp) -> Result<(), FundraisingError> {
    if schedules.is_empty() {
        return Ok(());
    }

    let mut sum = Dec::ZERO;
    let mut previous: Option<Timestamp> = None;

    for schedule in schedules {
        if schedule.release_time < end_time {
            return Err(FundraisingError::InvalidVestingSchedule(format!(
                "release time {} is before end time {end_time}",
                schedule.release_time
            )));
        }
        if let Some(prev) = previous {
            if schedule.release_time <= prev {
                return Err(FundraisingError::InvalidVestingSchedule(format!(
                    "release times must be strictly increasing ({prev} then {})",
                    schedule.release_time
                )));
            }
        }
        previous = Some(schedule.release_time);

        sum = sum.checked_add(schedule.weight).ok_or_else(|| {
            FundraisingError::InvalidVestingSchedule("weight sum overflow".into())
        })?;
    }

    if sum != Dec::ONE {
        return Err(FundraisingError::InvalidVestingSchedule(format!(
            "weights sum to {sum}, expected 1"
        )));
    }
    Ok(())
}

/// Entries not yet released whose release time is at or before `now`,
/// ascending by release time.
pub fn due_releases(entries: &[VestingQueueEntry], now: Timestamp) -> Vec<VestingQueueEntry> {
    let mut due: Vec<_> = entries
        .iter()
        .filter(|e| !e.released && e.release_time <= now)
        .cloned()
        .collect();
    due.sort_by_key(|e| e.release_time);
    due
}

/// Running weight of all entries strictly before `release_time`.
pub fn cumulative_weight_before(
    entries: &[VestingQueueEntry],
    release_time: Timestamp,
) -> Result<Dec, FundraisingError> {
    entries
        .iter()
        .filter(|e| e.release_time < release_time)
        .try_fold(Dec::ZERO, |acc, e| acc.checked_add(e.weight))
        .ok_or_else(|| FundraisingError::InvariantViolation("vesting weight overflow".into()))
}

/// Share of `total` released by a phase spanning `(before, before + weight]`.
pub fn release_amount(total: u128, before: Dec, weight: Dec) -> Result<u128, FundraisingError> {
    let after = before
        .checked_add(weight)
        .filter(|w| *w <= Dec::ONE)
        .ok_or_else(|| FundraisingError::InvariantViolation("vesting weight above one".into()))?;
    let overflow = || FundraisingError::InvariantViolation("vesting amount overflow".into());
    let upto = after.mul_floor(total).ok_or_else(overflow)?;
    let already = before.mul_floor(total).ok_or_else(overflow)?;
    Ok(upto - already)
}

/// Every queued release has been disbursed.
pub fn is_fully_released(entries: &[VestingQueueEntry]) -> bool {
    entries.iter().all(|e| e.released)
}
