//! Incremental assembly of directed wall edges into vertex chains.

/// Directed chains of surface vertex indices.
///
/// Every wall edge `from → to` has filled space on its left. A new edge
/// extends a chain ending at `from`, prepends to a chain starting at `to`,
/// or starts a new chain; afterwards chains sharing an endpoint are merged
/// until none do.
#[derive(Clone, Debug, Default)]
pub struct EdgeChains {
  chains: Vec<Vec<u32>>,
}

#[inline]
fn is_closed(chain: &[u32]) -> bool {
  chain.len() > 2 && chain.first() == chain.last()
}

impl EdgeChains {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    self.chains.clear();
  }

  pub fn chains(&self) -> &[Vec<u32>] {
    &self.chains
  }

  pub fn add(&mut self, from: u32, to: u32) {
    if let Some(chain) = self
      .chains
      .iter_mut()
      .find(|c| !is_closed(c) && c.last() == Some(&from))
    {
      chain.push(to);
    } else if let Some(chain) = self
      .chains
      .iter_mut()
      .find(|c| !is_closed(c) && c.first() == Some(&to))
    {
      chain.insert(0, from);
    } else {
      self.chains.push(vec![from, to]);
    }
    self.merge();
  }

  fn merge(&mut self) {
    loop {
      let Some((i, j)) = self.find_mergeable() else {
        return;
      };
      let tail = self.chains.remove(j);
      let i = if j < i { i - 1 } else { i };
      self.chains[i].extend_from_slice(&tail[1..]);
    }
  }

  /// A pair `(i, j)` where chain `i` ends where chain `j` starts.
  fn find_mergeable(&self) -> Option<(usize, usize)> {
    for (i, head) in self.chains.iter().enumerate() {
      if is_closed(head) {
        continue;
      }
      for (j, tail) in self.chains.iter().enumerate() {
        if i != j && !is_closed(tail) && head.last() == tail.first() {
          return Some((i, j));
        }
      }
    }
    None
  }
}

#[cfg(test)]
#[path = "edge_chain_test.rs"]
mod edge_chain_test;
