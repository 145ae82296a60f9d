//! Joining chunk-local loop fragments into whole boundary loops.
//!
//! Fragments meet where one chunk's tail hash equals another's head hash.
//! Starting from the first unconsumed fragment the chain is extended at its
//! tail, then at its head, rescanning after every extension, until nothing
//! attaches or the chain closes on itself.

use std::collections::{HashMap, VecDeque};

use smallvec::SmallVec;

use crate::surface::{BoundaryHash, EdgeSync};

/// Sync record of one fragment tagged with its chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncRecord {
  pub chunk: usize,
  pub sync: EdgeSync,
}

/// Ordered fragments of one stitched loop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StitchPlan {
  /// Indices into the record list, in loop order.
  pub records: Vec<usize>,
  /// Arc length at which each fragment starts.
  pub offsets: Vec<f32>,
  pub length: f32,
  pub closed: bool,
}

type Lookup = HashMap<BoundaryHash, SmallVec<[usize; 2]>>;

fn first_free(lookup: &Lookup, hash: BoundaryHash, consumed: &[bool]) -> Option<usize> {
  lookup.get(&hash)?.iter().copied().find(|&r| !consumed[r])
}

/// Group fragments into loops. Fragments with fewer than two points are
/// dropped; closed fragments form loops of their own.
pub fn stitch(records: &[SyncRecord]) -> Vec<StitchPlan> {
  let usable = |r: &SyncRecord| r.sync.point_count >= 2;

  let mut heads = Lookup::new();
  let mut tails = Lookup::new();
  for (k, r) in records.iter().enumerate() {
    if usable(r) && !r.sync.closed {
      heads.entry(r.sync.head).or_default().push(k);
      tails.entry(r.sync.tail).or_default().push(k);
    }
  }

  let mut consumed = vec![false; records.len()];
  let mut plans = Vec::new();
  for start in 0..records.len() {
    if consumed[start] || !usable(&records[start]) {
      continue;
    }
    consumed[start] = true;

    let mut chain = VecDeque::from([start]);
    let mut closed = records[start].sync.closed;
    while !closed {
      let head = records[chain[0]].sync.head;
      let tail = records[chain[chain.len() - 1]].sync.tail;
      if chain.len() > 1 && head == tail {
        closed = true;
      } else if let Some(next) = first_free(&heads, tail, &consumed) {
        consumed[next] = true;
        chain.push_back(next);
      } else if let Some(prev) = first_free(&tails, head, &consumed) {
        consumed[prev] = true;
        chain.push_front(prev);
      } else {
        break;
      }
    }

    let mut offsets = Vec::with_capacity(chain.len());
    let mut length = 0.0;
    for &r in &chain {
      offsets.push(length);
      length += records[r].sync.length;
    }
    plans.push(StitchPlan {
      records: chain.into(),
      offsets,
      length,
      closed,
    });
  }
  plans
}

#[cfg(test)]
#[path = "stitch_test.rs"]
mod stitch_test;
