use super::*;

fn record(chunk: usize, head: u64, tail: u64, length: f32) -> SyncRecord {
  SyncRecord {
    chunk,
    sync: EdgeSync {
      head,
      tail,
      length,
      closed: false,
      point_count: 3,
      fragment: 0,
    },
  }
}

#[test]
fn test_tail_to_head_joins_in_order() {
  let records = [record(0, 1, 2, 3.0), record(1, 2, 5, 4.0)];
  let plans = stitch(&records);
  assert_eq!(plans.len(), 1);
  assert_eq!(plans[0].records, vec![0, 1]);
  assert_eq!(plans[0].offsets, vec![0.0, 3.0]);
  assert_eq!(plans[0].length, 7.0);
  assert!(!plans[0].closed);
}

#[test]
fn test_head_extension_prepends() {
  // Scanning starts at the later fragment; its predecessor is prepended.
  let records = [record(1, 2, 5, 4.0), record(0, 1, 2, 3.0)];
  let plans = stitch(&records);
  assert_eq!(plans.len(), 1);
  assert_eq!(plans[0].records, vec![1, 0]);
  assert_eq!(plans[0].offsets, vec![0.0, 3.0]);
}

#[test]
fn test_unmatched_fragments_stay_separate() {
  let records = [record(0, 1, 2, 1.0), record(1, 3, 4, 1.0)];
  let plans = stitch(&records);
  assert_eq!(plans.len(), 2);
  assert_eq!(plans[0].records, vec![0]);
  assert_eq!(plans[1].records, vec![1]);
}

#[test]
fn test_ring_of_fragments_closes() {
  let records = [
    record(0, 1, 2, 1.0),
    record(1, 3, 1, 1.0),
    record(2, 2, 3, 1.0),
  ];
  let plans = stitch(&records);
  assert_eq!(plans.len(), 1);
  assert!(plans[0].closed);
  assert_eq!(plans[0].records, vec![0, 2, 1]);
  assert_eq!(plans[0].length, 3.0);
}

#[test]
fn test_closed_and_degenerate_fragments() {
  let mut closed = record(0, 9, 9, 2.0);
  closed.sync.closed = true;
  let mut degenerate = record(1, 1, 2, 0.0);
  degenerate.sync.point_count = 1;
  let plans = stitch(&[closed, degenerate, record(2, 9, 4, 1.0)]);
  assert_eq!(plans.len(), 2);
  assert_eq!(plans[0].records, vec![0]);
  assert!(plans[0].closed);
  // The open fragment sharing the closed one's hash is not absorbed.
  assert_eq!(plans[1].records, vec![2]);
}
