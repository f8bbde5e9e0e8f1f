use crate::error::{CoreError, Result};
use crate::limits::EditorLimits;
use crate::types::{ClipEntry, ClipField};
use std::fmt;

/// What changed in the timeline. Sent to observers after the mutation has
/// fully completed.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    Appended { index: usize },
    Inserted { index: usize },
    Removed { index: usize },
    Reordered,
    FieldUpdated { index: usize, field: &'static str },
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Observers see the event and a read-only view of the clips, so they cannot
/// mutate the timeline while it is notifying.
pub type Observer = Box<dyn FnMut(&TimelineEvent, &[ClipEntry])>;

/// The ordered clip list for one editing session.
pub struct Timeline {
    clips: Vec<ClipEntry>,
    limits: EditorLimits,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl Timeline {
    pub fn new(limits: EditorLimits) -> Self {
        Self {
            clips: Vec::new(),
            limits,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Restore a timeline from previously saved clips. No event is emitted.
    /// Every clip must satisfy `limits`.
    pub fn with_clips(clips: Vec<ClipEntry>, limits: EditorLimits) -> Result<Self> {
        let timeline = Self::new(limits);
        for clip in &clips {
            timeline.check_duration(clip.duration)?;
        }
        Ok(Self { clips, ..timeline })
    }

    pub fn clips(&self) -> &[ClipEntry] {
        &self.clips
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClipEntry> {
        self.clips.iter()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClipEntry> {
        self.clips.get(index)
    }

    pub fn limits(&self) -> &EditorLimits {
        &self.limits
    }

    /// Sum of all clip durations, added in playback order.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().fold(0.0, |total, clip| total + clip.duration)
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns false if the subscription was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn notify(&mut self, event: TimelineEvent) {
        let clips = &self.clips;
        for (_, observer) in self.observers.iter_mut() {
            observer(&event, clips);
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a clip to the end. Returns its index.
    pub fn append(&mut self, clip: ClipEntry) -> Result<usize> {
        self.check_duration(clip.duration)?;
        self.clips.push(clip);
        let index = self.clips.len() - 1;
        self.notify(TimelineEvent::Appended { index });
        Ok(index)
    }

    /// Insert a clip at `index` (`index == len` appends).
    pub fn insert(&mut self, index: usize, clip: ClipEntry) -> Result<()> {
        if index > self.clips.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.clips.len(),
            });
        }
        self.check_duration(clip.duration)?;
        self.clips.insert(index, clip);
        self.notify(TimelineEvent::Inserted { index });
        Ok(())
    }

    /// Remove the clip at `index` and return it.
    pub fn remove(&mut self, index: usize) -> Result<ClipEntry> {
        self.check_index(index)?;
        let clip = self.clips.remove(index);
        self.notify(TimelineEvent::Removed { index });
        Ok(clip)
    }

    /// Rebuild the list so that position `i` holds the clip previously at
    /// `order[i]`. `order` must be a permutation of `0..len`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        validate_permutation(order, self.clips.len())?;

        let mut slots: Vec<Option<ClipEntry>> = self.clips.drain(..).map(Some).collect();
        self.clips = order
            .iter()
            .filter_map(|&from| slots[from].take())
            .collect();

        self.notify(TimelineEvent::Reordered);
        Ok(())
    }

    /// Move a single clip from `from` to `to`, shifting the clips between.
    pub fn move_clip(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let clip = self.clips.remove(from);
        self.clips.insert(to, clip);
        self.notify(TimelineEvent::Reordered);
        Ok(())
    }

    /// Set one field of the clip at `index`. Returns the previous value.
    ///
    /// Durations must be positive and within the clip limit; anything else
    /// is rejected and the clip is left unchanged.
    pub fn update_field(&mut self, index: usize, change: ClipField) -> Result<ClipField> {
        self.check_index(index)?;
        if let ClipField::Duration(d) = change {
            self.check_duration(d)?;
        }
        Ok(self.write_field(index, change))
    }

    /// Put back a value that `update_field` previously returned. Skips the
    /// range check so an undo always lands.
    pub(crate) fn restore_field(&mut self, index: usize, previous: ClipField) -> Result<()> {
        self.check_index(index)?;
        self.write_field(index, previous);
        Ok(())
    }

    fn write_field(&mut self, index: usize, change: ClipField) -> ClipField {
        let clip = &mut self.clips[index];
        let previous = change.current(clip);
        change.apply(clip);

        self.notify(TimelineEvent::FieldUpdated {
            index,
            field: change.name(),
        });
        previous
    }

    /// Swap in a whole new clip list.
    pub fn replace_all(&mut self, clips: Vec<ClipEntry>) -> Result<()> {
        for clip in &clips {
            self.check_duration(clip.duration)?;
        }
        self.clips = clips;
        self.notify(TimelineEvent::Replaced);
        Ok(())
    }

    fn check_duration(&self, duration: f64) -> Result<()> {
        if self.limits.accepts_clip_duration(duration) {
            Ok(())
        } else {
            Err(CoreError::InvalidDuration(format!(
                "{duration} is not within (0, {}]",
                self.limits.max_clip_duration
            )))
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.clips.len() {
            Ok(())
        } else {
            Err(CoreError::IndexOutOfRange {
                index,
                len: self.clips.len(),
            })
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(EditorLimits::default())
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("clips", &self.clips)
            .field("limits", &self.limits)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Check that `order` is a bijection over `0..len`.
pub fn validate_permutation(order: &[usize], len: usize) -> Result<()> {
    if order.len() != len {
        return Err(CoreError::InvalidPermutation(format!(
            "expected {len} indices, got {}",
            order.len()
        )));
    }
    let mut seen = vec![false; len];
    for &i in order {
        if i >= len {
            return Err(CoreError::InvalidPermutation(format!(
                "index {i} out of range for {len} clips"
            )));
        }
        if seen[i] {
            return Err(CoreError::InvalidPermutation(format!(
                "index {i} appears more than once"
            )));
        }
        seen[i] = true;
    }
    Ok(())
}

/// Inverse of a permutation: applying `inverse(p)` after `p` restores the
/// original order.
pub fn invert_permutation(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; order.len()];
    for (position, &from) in order.iter().enumerate() {
        inverse[from] = position;
    }
    inverse
}
