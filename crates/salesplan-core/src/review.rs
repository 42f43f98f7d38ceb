//! Row review statuses and the transition graph that governs them.
//!
//! A row's review status is workflow metadata kept outside the row itself,
//! keyed by [`RowKey`]. An absent key means [`RowStatus::Pending`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RowStatus {
  #[default]
  Pending,
  Approved,
  Denied,
  Published,
}

impl RowStatus {
  /// Rows the reviewer still has to act on.
  pub fn in_review_queue(self) -> bool {
    matches!(self, Self::Pending | Self::Approved)
  }

  /// Rows still being worked on by the editor.
  pub fn in_editor_queue(self) -> bool { self != Self::Published }

  /// Whether the row's values may still be revised by the editor.
  pub fn is_revisable(self) -> bool { self != Self::Published }

  /// The status reached by applying `action`:
  ///
  /// ```text
  /// pending  -approve->  approved
  /// pending  -deny->     denied
  /// approved -publish->  published
  /// approved -deny->     denied
  /// denied   -resubmit-> pending
  /// any      -reset->    pending
  /// ```
  pub fn apply(self, action: ReviewAction) -> Result<Self> {
    use ReviewAction as A;
    use RowStatus as S;
    match (self, action) {
      (S::Pending, A::Approve) => Ok(S::Approved),
      (S::Pending | S::Approved, A::Deny) => Ok(S::Denied),
      (S::Approved, A::Publish) => Ok(S::Published),
      (S::Denied, A::Resubmit) => Ok(S::Pending),
      (_, A::Reset) => Ok(S::Pending),
      (from, action) => Err(Error::InvalidTransition { from, action }),
    }
  }
}

/// A reviewer or editor action on a single row.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewAction {
  Approve,
  Deny,
  Publish,
  /// Return to pending from any state.
  Reset,
  /// Return a denied row to pending without changing its values.
  Resubmit,
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Identifies one row of one plan. Rendered as `"{planId}-{ordinal}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
  pub plan_id: Uuid,
  pub ordinal: usize,
}

impl RowKey {
  pub fn new(plan_id: Uuid, ordinal: usize) -> Self { Self { plan_id, ordinal } }
}

impl fmt::Display for RowKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.plan_id, self.ordinal)
  }
}

#[derive(Debug, thiserror::Error)]
#[error("malformed row key: {0:?}")]
pub struct RowKeyParseError(String);

impl FromStr for RowKey {
  type Err = RowKeyParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    // The plan id itself contains hyphens; the ordinal follows the last one.
    let (id, ordinal) =
      s.rsplit_once('-').ok_or_else(|| RowKeyParseError(s.to_owned()))?;
    Ok(Self {
      plan_id: Uuid::parse_str(id).map_err(|_| RowKeyParseError(s.to_owned()))?,
      ordinal: ordinal.parse().map_err(|_| RowKeyParseError(s.to_owned()))?,
    })
  }
}

impl Serialize for RowKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for RowKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn approve_then_publish_is_legal() {
    let approved = RowStatus::Pending.apply(ReviewAction::Approve).unwrap();
    assert_eq!(approved.apply(ReviewAction::Publish).unwrap(), RowStatus::Published);
  }

  #[test]
  fn publish_requires_approval() {
    for from in [RowStatus::Pending, RowStatus::Denied, RowStatus::Published] {
      assert!(matches!(
        from.apply(ReviewAction::Publish),
        Err(Error::InvalidTransition { action: ReviewAction::Publish, .. })
      ));
    }
  }

  #[test]
  fn reset_always_yields_pending() {
    for from in RowStatus::iter() {
      let once = from.apply(ReviewAction::Reset).unwrap();
      assert_eq!(once, RowStatus::Pending);
      assert_eq!(once.apply(ReviewAction::Reset).unwrap(), RowStatus::Pending);
    }
  }

  #[test]
  fn deny_overrides_approval() {
    assert_eq!(
      RowStatus::Approved.apply(ReviewAction::Deny).unwrap(),
      RowStatus::Denied
    );
  }

  #[test]
  fn resubmit_only_from_denied() {
    assert_eq!(
      RowStatus::Denied.apply(ReviewAction::Resubmit).unwrap(),
      RowStatus::Pending
    );
    for from in [RowStatus::Pending, RowStatus::Approved, RowStatus::Published] {
      assert!(from.apply(ReviewAction::Resubmit).is_err());
    }
  }

  #[test]
  fn every_illegal_pair_is_rejected() {
    let legal = [
      (RowStatus::Pending, ReviewAction::Approve),
      (RowStatus::Pending, ReviewAction::Deny),
      (RowStatus::Approved, ReviewAction::Publish),
      (RowStatus::Approved, ReviewAction::Deny),
      (RowStatus::Denied, ReviewAction::Resubmit),
    ];
    for from in RowStatus::iter() {
      for action in ReviewAction::iter() {
        let ok = from.apply(action).is_ok();
        let expected = action == ReviewAction::Reset || legal.contains(&(from, action));
        assert_eq!(ok, expected, "{from} -{action}->");
      }
    }
  }

  #[test]
  fn row_key_round_trips_through_its_string_form() {
    let key = RowKey::new(Uuid::new_v4(), 12);
    let rendered = key.to_string();
    assert!(rendered.ends_with("-12"));
    assert_eq!(rendered.parse::<RowKey>().unwrap(), key);
    assert!("not-a-key".parse::<RowKey>().is_err());
  }
}
