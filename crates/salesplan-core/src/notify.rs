//! A synchronous observer registry for status-store implementations.
//!
//! Callbacks run on the thread that committed the change, after the commit
//! and outside the registry lock, so a callback may itself subscribe or
//! unsubscribe.

use std::sync::{
  Arc, Mutex, PoisonError,
  atomic::{AtomicU64, Ordering},
};

use crate::store::{StatusChange, SubscriptionId};

type Callback = Arc<dyn Fn(&StatusChange) + Send + Sync>;

#[derive(Default)]
pub struct Observers {
  next_id:   AtomicU64,
  callbacks: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Observers {
  pub fn new() -> Self { Self::default() }

  pub fn subscribe(
    &self,
    callback: Box<dyn Fn(&StatusChange) + Send + Sync>,
  ) -> SubscriptionId {
    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self
      .callbacks
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((id, Arc::from(callback)));
    id
  }

  /// Returns `false` if `id` was not subscribed.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    let mut callbacks =
      self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
    let before = callbacks.len();
    callbacks.retain(|(existing, _)| *existing != id);
    callbacks.len() != before
  }

  pub fn notify(&self, change: &StatusChange) {
    let snapshot: Vec<Callback> = self
      .callbacks
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(_, cb)| Arc::clone(cb))
      .collect();
    for callback in snapshot {
      callback(change);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use uuid::Uuid;

  use super::*;
  use crate::review::{RowKey, RowStatus};

  fn change() -> StatusChange {
    StatusChange::Set {
      key:      RowKey::new(Uuid::nil(), 0),
      status:   RowStatus::Approved,
      revision: 1,
    }
  }

  #[test]
  fn every_subscriber_sees_each_change() {
    let observers = Observers::new();
    let seen = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
      let seen = Arc::clone(&seen);
      observers.subscribe(Box::new(move |_: &StatusChange| {
        seen.fetch_add(1, Ordering::SeqCst);
      }));
    }
    observers.notify(&change());
    assert_eq!(seen.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn unsubscribed_callbacks_stop_firing() {
    let observers = Observers::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let id = observers.subscribe(Box::new(move |_: &StatusChange| {
      counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(observers.unsubscribe(id));
    assert!(!observers.unsubscribe(id));
    observers.notify(&change());
    assert_eq!(seen.load(Ordering::SeqCst), 0);
  }
}
