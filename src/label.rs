//! Cluster labels and the two ways of presenting them to callers.

/// A cluster label, as produced by the clustering capability or after normalization.
pub type Label = i64;

/// The label the clustering capability gives to points that belong to no cluster.
pub const NOISE: Label = -1;

/// How a raw label is turned into the label returned to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelPolicy {
    /// Shift every label by one, so that noise becomes `0`.
    /// Only a raw label of `Label::MAX`, which cannot be shifted, yields no label.
    Offset,
    /// Keep labels unchanged but report noise as "no cluster".
    Sentinel,
}

impl LabelPolicy {
    /// Normalizes a raw label.
    /// ```
    /// use fluent_clicks::label::*;
    ///
    /// assert_eq!(Some(0), LabelPolicy::Offset.normalize(NOISE));
    /// assert_eq!(None, LabelPolicy::Sentinel.normalize(NOISE));
    /// assert_eq!(Some(3), LabelPolicy::Sentinel.normalize(3));
    /// ```
    pub fn normalize(&self, raw: Label) -> Option<Label> {
        match self {
            LabelPolicy::Offset => offset(raw),
            LabelPolicy::Sentinel => sentinel(raw),
        }
    }
}

fn offset(raw: Label) -> Option<Label> {
    raw.checked_add(1)
}

fn sentinel(raw: Label) -> Option<Label> {
    if raw == NOISE {
        None
    } else {
        Some(raw)
    }
}
