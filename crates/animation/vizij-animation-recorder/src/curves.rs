//! Sparse scalar curve capture.
//!
//! Each tick the pose source hands over a [`CurveSample`]: dense value and
//! validity arrays indexed by *slot*, plus a shared [`CurveIdentityTable`]
//! mapping skeleton curve uids to slots. The table may be swapped between
//! frames; only its slot count is required to stay stable.

use std::sync::Arc;

use crate::ids::CurveUid;

/// uid → slot lookup. Index is the curve uid; `None` means the uid has no slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurveIdentityTable {
    slots: Vec<Option<u16>>,
}

impl CurveIdentityTable {
    pub fn new(slots: Vec<Option<u16>>) -> Self {
        Self { slots }
    }

    /// Assign consecutive slots to `uids` in the given order.
    pub fn from_uids(uids: &[CurveUid]) -> Self {
        let len = uids.iter().map(|u| u.index() + 1).max().unwrap_or(0);
        let mut slots = vec![None; len];
        for (slot, uid) in uids.iter().enumerate() {
            slots[uid.index()] = Some(slot as u16);
        }
        Self { slots }
    }

    /// Number of uid entries in the lookup, mapped or not.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot(&self, uid: CurveUid) -> Option<usize> {
        self.slots
            .get(uid.index())
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Length of the value arrays a sample using this table needs.
    pub fn value_len(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .map(|s| usize::from(*s) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Mapped `(uid, slot)` pairs in uid order.
    pub fn entries(&self) -> impl Iterator<Item = (CurveUid, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(uid, slot)| slot.map(|s| (CurveUid(uid as u16), usize::from(s))))
    }
}

/// One frame's worth of curve values as produced by the pose source.
#[derive(Clone, Debug, Default)]
pub struct CurveSample {
    table: Option<Arc<CurveIdentityTable>>,
    weights: Vec<f32>,
    valid: Vec<bool>,
}

impl CurveSample {
    /// A sample with every slot present but invalid.
    pub fn new(table: Arc<CurveIdentityTable>) -> Self {
        let n = table.value_len();
        Self {
            table: Some(table),
            weights: vec![0.0; n],
            valid: vec![false; n],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Set a curve value and mark it valid. Returns false if the uid has no slot.
    pub fn set(&mut self, uid: CurveUid, value: f32) -> bool {
        match self.slot_of(uid) {
            Some(slot) => {
                self.weights[slot] = value;
                self.valid[slot] = true;
                true
            }
            None => false,
        }
    }

    pub fn invalidate(&mut self, uid: CurveUid) {
        if let Some(slot) = self.slot_of(uid) {
            self.valid[slot] = false;
        }
    }

    pub fn get(&self, uid: CurveUid) -> Option<f32> {
        let slot = self.slot_of(uid)?;
        self.valid[slot].then(|| self.weights[slot])
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn table(&self) -> Option<&Arc<CurveIdentityTable>> {
        self.table.as_ref()
    }

    fn slot_of(&self, uid: CurveUid) -> Option<usize> {
        self.table
            .as_ref()
            .and_then(|t| t.slot(uid))
            .filter(|s| *s < self.weights.len())
    }
}

/// Stored snapshot of one recorded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CurveFrame {
    pub frame: u32,
    pub weights: Vec<f32>,
    pub valid: Vec<bool>,
}

impl CurveFrame {
    /// Value at `slot` if it was valid on this frame. Slots beyond the stored
    /// arrays count as invalid.
    #[inline]
    pub fn value(&self, slot: usize) -> Option<f32> {
        match self.valid.get(slot) {
            Some(true) => self.weights.get(slot).copied(),
            _ => None,
        }
    }
}

/// Outcome of comparing the remembered identity table with a new frame's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// Same table (by reference or content).
    Compatible,
    /// Different table with the same slot count; adopt the new one.
    Replace,
    /// Slot count changed. Reported, then the new table is adopted anyway.
    Inconsistent { expected: usize, actual: usize },
}

/// Compare two identity tables. Only the slot count is checked: differently
/// composed tables of equal size are accepted as a replacement.
pub fn reconcile(prev: &Arc<CurveIdentityTable>, next: &Arc<CurveIdentityTable>) -> Reconciliation {
    if Arc::ptr_eq(prev, next) || prev == next {
        Reconciliation::Compatible
    } else if prev.slot_count() == next.slot_count() {
        Reconciliation::Replace
    } else {
        Reconciliation::Inconsistent {
            expected: prev.slot_count(),
            actual: next.slot_count(),
        }
    }
}

/// Frame-indexed curve snapshots and the identity table that decodes them.
#[derive(Debug, Default)]
pub struct CurveAccumulator {
    frames: Vec<CurveFrame>,
    table: Option<Arc<CurveIdentityTable>>,
}

impl CurveAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot of `sample` for `frame`.
    ///
    /// Returns the reconciliation against the previously remembered table, or
    /// `None` when this is the first table seen.
    pub fn push(&mut self, frame: u32, sample: &CurveSample) -> Option<Reconciliation> {
        self.frames.push(CurveFrame {
            frame,
            weights: sample.weights.clone(),
            valid: sample.valid.clone(),
        });

        let next = sample.table.as_ref()?;
        match &self.table {
            None => {
                self.table = Some(Arc::clone(next));
                None
            }
            Some(prev) => {
                let outcome = reconcile(prev, next);
                if outcome != Reconciliation::Compatible {
                    self.table = Some(Arc::clone(next));
                }
                Some(outcome)
            }
        }
    }

    #[inline]
    pub fn frames(&self) -> &[CurveFrame] {
        &self.frames
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn table(&self) -> Option<&Arc<CurveIdentityTable>> {
        self.table.as_ref()
    }
}
