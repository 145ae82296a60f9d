//! Single-slot background task handle.
//!
//! Each chunk owns one [`TaskSlot`]. Work runs on rayon's thread pool via
//! `rayon::spawn`; completion is signalled through a bounded(1) channel.
//! There is no queue: scheduling a new task first blocks on the previous one.
//!
//! ```text
//!   spawn(work) ──► wait() on prior ──► rayon::spawn ──► work() ──► send(())
//!                                                                     │
//!   wait() / drop ◄──────────────────── recv() ◄──────────────────────┘
//! ```

use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{self as channel, Receiver, TryRecvError};

#[derive(Debug, Default)]
pub struct TaskSlot {
  /// Completion signal of the outstanding task, if any.
  receiver: Mutex<Option<Receiver<()>>>,
}

impl TaskSlot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `work` on the thread pool after the previous task finished.
  pub fn spawn<F>(&self, work: F)
  where
    F: FnOnce() + Send + 'static,
  {
    let mut slot = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(previous) = slot.take() {
      // Disconnected means the worker panicked; nothing left to wait for.
      let _ = previous.recv();
    }

    let (sender, receiver) = channel::bounded(1);
    *slot = Some(receiver);

    rayon::spawn(move || {
      work();
      let _ = sender.send(());
    });
  }

  /// Block until the outstanding task (if any) completes.
  ///
  /// The slot stays locked while waiting, so a concurrent `spawn` cannot
  /// start its work until the current task is done.
  pub fn wait(&self) {
    let mut slot = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(receiver) = slot.as_ref() {
      let _ = receiver.recv();
    }
    *slot = None;
  }

  /// Non-blocking completion check. Clears the slot when the task is done.
  pub fn is_busy(&self) -> bool {
    let mut slot = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(receiver) = slot.as_ref() else {
      return false;
    };
    match receiver.try_recv() {
      Err(TryRecvError::Empty) => true,
      Ok(()) | Err(TryRecvError::Disconnected) => {
        *slot = None;
        false
      }
    }
  }
}

impl Drop for TaskSlot {
  fn drop(&mut self) {
    self.wait();
  }
}

#[cfg(test)]
#[path = "task_test.rs"]
mod task_test;
