//! Tournament merger: combines the N finalized per-worker owner lists into
//! one via log₂N rounds of pairwise merges. Worker `i` is paired with worker
//! `i + N/2`; pairs within a round share no state and run in parallel,
//! mirroring the data-parallel fan-out this codebase uses for per-file work
//! elsewhere. Rounds are a strict barrier: the next round never starts
//! before every pair in the current one has joined.

use crate::config::MAX_NAMESPACES;
use crate::error::ReduceError;
use crate::owner::FinalOwner;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Merge two owners that share a uuid: nested two-pointer merge of their
/// object lists, deduplicating objects seen by both workers, followed by
/// folding `b`'s (now-adjusted) counters into `a`'s.
fn merge_owners(mut a: FinalOwner, mut b: FinalOwner) -> FinalOwner {
    let mut merged_objects = Vec::with_capacity(a.objects.len() + b.objects.len());
    let mut ai = 0usize;
    let mut bi = 0usize;

    loop {
        match (a.objects.get(ai), b.objects.get(bi)) {
            (Some(oa), Some(ob)) => match oa.uuid.cmp(ob.uuid) {
                Ordering::Equal => {
                    // Duplicate across workers: a already counted it once;
                    // remove b's sighting of the object and its bytes, but
                    // credit b's one key-sighting to a.
                    let nsid = ob.nsid;
                    b.objs[nsid] -= 1;
                    b.bytes[nsid] -= ob.size_bytes;
                    b.keys[nsid] -= 1;
                    a.keys[nsid] += 1;
                    merged_objects.push(*oa);
                    ai += 1;
                    bi += 1;
                }
                Ordering::Less => {
                    merged_objects.push(*oa);
                    ai += 1;
                }
                Ordering::Greater => {
                    // Object only in b: transfer it to a's side.
                    let nsid = ob.nsid;
                    b.objs[nsid] -= 1;
                    b.keys[nsid] -= 1;
                    b.bytes[nsid] -= ob.size_bytes;
                    a.objs[nsid] += 1;
                    a.keys[nsid] += 1;
                    a.bytes[nsid] += ob.size_bytes;
                    merged_objects.push(*ob);
                    bi += 1;
                }
            },
            (Some(oa), None) => {
                merged_objects.push(*oa);
                ai += 1;
            }
            (None, Some(ob)) => {
                merged_objects.push(*ob);
                bi += 1;
            }
            (None, None) => break,
        }
    }

    for n in 0..MAX_NAMESPACES {
        a.dirs[n] += b.dirs[n];
        a.objs[n] += b.objs[n];
        a.keys[n] += b.keys[n];
        a.bytes[n] += b.bytes[n];
    }

    FinalOwner { uuid: a.uuid, objects: merged_objects, dirs: a.dirs, objs: a.objs, keys: a.keys, bytes: a.bytes }
}

/// Two-pointer merge of two uuid-sorted owner lists, combining owners that
/// share a uuid and passing the rest through untouched.
fn merge_owner_lists(a: Vec<FinalOwner>, b: Vec<FinalOwner>) -> Vec<FinalOwner> {
    let mut ai = a.into_iter().peekable();
    let mut bi = b.into_iter().peekable();
    let mut merged = Vec::new();

    loop {
        let ordering = match (ai.peek(), bi.peek()) {
            (Some(oa), Some(ob)) => Some(oa.uuid.cmp(ob.uuid)),
            (Some(_), None) => Some(Ordering::Less),
            (None, Some(_)) => Some(Ordering::Greater),
            (None, None) => None,
        };
        match ordering {
            Some(Ordering::Equal) => {
                let a_owner = ai.next().unwrap();
                let b_owner = bi.next().unwrap();
                merged.push(merge_owners(a_owner, b_owner));
            }
            Some(Ordering::Less) => merged.push(ai.next().unwrap()),
            Some(Ordering::Greater) => merged.push(bi.next().unwrap()),
            None => break,
        }
    }

    merged
}

/// Run all log₂N merge rounds over the finalized worker states, returning
/// the single merged owner list, uuid-sorted.
pub fn tournament_merge(mut states: Vec<Vec<FinalOwner>>) -> Result<Vec<FinalOwner>, ReduceError> {
    let mut live = states.len();
    if live == 0 {
        return Ok(Vec::new());
    }
    if !live.is_power_of_two() {
        return Err(ReduceError::InvariantViolation(format!(
            "tournament merge requires a power-of-two worker count, got {live}"
        )));
    }

    while live > 1 {
        let half = live / 2;
        let (front, back) = states[..live].split_at_mut(half);
        front.par_iter_mut().zip(back.par_iter_mut()).for_each(|(a, b)| {
            let merged = merge_owner_lists(std::mem::take(a), std::mem::take(b));
            *a = merged;
        });
        live = half;
    }

    let result = states.into_iter().next().unwrap_or_default();
    validate_sorted(&result)?;
    Ok(result)
}

/// Sanity check that the merged list stayed uuid-sorted with no duplicates.
/// `merge_owner_lists` drains both inputs by construction, so a violation
/// here would point to a logic bug in the merge rather than malformed input.
fn validate_sorted(owners: &[FinalOwner]) -> Result<(), ReduceError> {
    for pair in owners.windows(2) {
        if pair[0].uuid >= pair[1].uuid {
            return Err(ReduceError::InvariantViolation(format!(
                "merged owner list out of order or duplicated at `{}` / `{}`",
                pair[0].uuid, pair[1].uuid
            )));
        }
    }
    Ok(())
}
