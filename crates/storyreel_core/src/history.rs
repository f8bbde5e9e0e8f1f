use crate::error::{CoreError, Result};
use crate::timeline::{invert_permutation, Timeline};
use crate::types::{ClipEntry, ClipField};
use std::collections::VecDeque;

/// A timeline edit that can be executed, undone, and described.
///
/// Commands record whatever they need for `undo` while executing.
pub trait Command: std::fmt::Debug {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()>;
    fn undo(&mut self, timeline: &mut Timeline) -> Result<()>;
    fn description(&self) -> &str;
}

/// Undo/redo history for one editing session.
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Execute a command and push it onto the undo stack. Clears redo stack.
    /// A command that fails is dropped and leaves both stacks untouched.
    pub fn execute(&mut self, mut cmd: Box<dyn Command>, timeline: &mut Timeline) -> Result<()> {
        cmd.execute(timeline)?;
        self.record(cmd);
        Ok(())
    }

    /// Push a command whose effect was already applied to the timeline by
    /// someone else, such as a completed drag.
    pub fn record(&mut self, cmd: Box<dyn Command>) {
        self.redo_stack.clear();
        self.undo_stack.push_back(cmd);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.pop_front();
        }
    }

    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let mut cmd = self.undo_stack.pop_back().ok_or(CoreError::NothingToUndo)?;
        if let Err(e) = cmd.undo(timeline) {
            self.undo_stack.push_back(cmd);
            return Err(e);
        }
        self.redo_stack.push(cmd);
        Ok(())
    }

    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let mut cmd = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        if let Err(e) = cmd.execute(timeline) {
            self.redo_stack.push(cmd);
            return Err(e);
        }
        self.undo_stack.push_back(cmd);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

// ---------------------------------------------------------------------------
// AppendClip
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppendClip {
    clip: ClipEntry,
    index: Option<usize>,
}

impl AppendClip {
    pub fn new(clip: ClipEntry) -> Self {
        Self { clip, index: None }
    }
}

impl Command for AppendClip {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        self.index = Some(timeline.append(self.clip.clone())?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let index = self.index.ok_or(CoreError::NothingToUndo)?;
        timeline.remove(index).map(|_| ())
    }

    fn description(&self) -> &str {
        "Add clip"
    }
}

// ---------------------------------------------------------------------------
// RemoveClip
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RemoveClip {
    index: usize,
    removed: Option<ClipEntry>,
}

impl RemoveClip {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            removed: None,
        }
    }
}

impl Command for RemoveClip {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        self.removed = Some(timeline.remove(self.index)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let clip = self.removed.take().ok_or(CoreError::NothingToUndo)?;
        if let Err(e) = timeline.insert(self.index, clip.clone()) {
            self.removed = Some(clip);
            return Err(e);
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove clip"
    }
}

// ---------------------------------------------------------------------------
// ReorderClips
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ReorderClips {
    order: Vec<usize>,
}

impl ReorderClips {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order }
    }

    /// Single-clip move expressed as a full permutation.
    pub fn moving(len: usize, from: usize, to: usize) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        if from < len && to < len {
            let moved = order.remove(from);
            order.insert(to, moved);
        }
        Self { order }
    }
}

impl Command for ReorderClips {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline.reorder(&self.order)
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        timeline.reorder(&invert_permutation(&self.order))
    }

    fn description(&self) -> &str {
        "Reorder clips"
    }
}

// ---------------------------------------------------------------------------
// UpdateClipField
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UpdateClipField {
    index: usize,
    change: ClipField,
    previous: Option<ClipField>,
}

impl UpdateClipField {
    pub fn new(index: usize, change: ClipField) -> Self {
        Self {
            index,
            change,
            previous: None,
        }
    }
}

impl Command for UpdateClipField {
    fn execute(&mut self, timeline: &mut Timeline) -> Result<()> {
        self.previous = Some(timeline.update_field(self.index, self.change)?);
        Ok(())
    }

    fn undo(&mut self, timeline: &mut Timeline) -> Result<()> {
        let previous = self.previous.ok_or(CoreError::NothingToUndo)?;
        timeline.restore_field(self.index, previous)
    }

    fn description(&self) -> &str {
        match self.change {
            ClipField::Duration(_) => "Change duration",
            ClipField::KeepAudio(_) => "Toggle audio",
            ClipField::StartTransition(_) => "Change start transition",
            ClipField::EndTransition(_) => "Change end transition",
            ClipField::Filter(_) => "Change filter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Filter;

    fn make_timeline() -> Timeline {
        let mut tl = Timeline::default();
        for name in ["a.png", "b.mp4", "c.gif"] {
            tl.append(ClipEntry::new(name)).unwrap();
        }
        tl
    }

    fn names(tl: &Timeline) -> Vec<&str> {
        tl.iter().map(|c| c.filename.as_str()).collect()
    }

    #[test]
    fn append_undo_redo() {
        let mut tl = Timeline::default();
        let mut history = History::default();
        history
            .execute(Box::new(AppendClip::new(ClipEntry::new("x.png"))), &mut tl)
            .unwrap();
        assert_eq!(tl.len(), 1);
        history.undo(&mut tl).unwrap();
        assert!(tl.is_empty());
        history.redo(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["x.png"]);
    }

    #[test]
    fn remove_undo_restores_position() {
        let mut tl = make_timeline();
        let mut history = History::default();
        history.execute(Box::new(RemoveClip::new(1)), &mut tl).unwrap();
        assert_eq!(names(&tl), vec!["a.png", "c.gif"]);
        history.undo(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["a.png", "b.mp4", "c.gif"]);
    }

    #[test]
    fn reorder_undo_restores_order() {
        let mut tl = make_timeline();
        let mut history = History::default();
        history
            .execute(Box::new(ReorderClips::new(vec![2, 0, 1])), &mut tl)
            .unwrap();
        assert_eq!(names(&tl), vec!["c.gif", "a.png", "b.mp4"]);
        history.undo(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["a.png", "b.mp4", "c.gif"]);
        history.redo(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["c.gif", "a.png", "b.mp4"]);
    }

    #[test]
    fn moving_builds_permutation() {
        let mut tl = make_timeline();
        let mut history = History::default();
        history
            .execute(Box::new(ReorderClips::moving(3, 0, 2)), &mut tl)
            .unwrap();
        assert_eq!(names(&tl), vec!["b.mp4", "c.gif", "a.png"]);
    }

    #[test]
    fn field_update_undo() {
        let mut tl = make_timeline();
        let mut history = History::default();
        history
            .execute(
                Box::new(UpdateClipField::new(0, ClipField::Filter(Filter::Neon))),
                &mut tl,
            )
            .unwrap();
        assert_eq!(history.undo_description(), Some("Change filter"));
        history.undo(&mut tl).unwrap();
        assert_eq!(tl.get(0).unwrap().filter, Filter::None);
        assert_eq!(history.redo_description(), Some("Change filter"));
    }

    #[test]
    fn undo_restores_duration_above_current_limit() {
        let mut tl = make_timeline();
        tl.restore_field(0, ClipField::Duration(400.0)).unwrap();
        let mut history = History::default();
        history
            .execute(
                Box::new(UpdateClipField::new(0, ClipField::Duration(10.0))),
                &mut tl,
            )
            .unwrap();
        assert_eq!(tl.get(0).unwrap().duration, 10.0);

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.get(0).unwrap().duration, 400.0);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        history.redo(&mut tl).unwrap();
        assert_eq!(tl.get(0).unwrap().duration, 10.0);
    }

    #[test]
    fn failed_command_is_not_recorded() {
        let mut tl = make_timeline();
        let mut history = History::default();
        let result = history.execute(
            Box::new(UpdateClipField::new(0, ClipField::Duration(-1.0))),
            &mut tl,
        );
        assert!(matches!(result, Err(CoreError::InvalidDuration(_))));
        assert!(!history.can_undo());
    }

    #[test]
    fn execute_clears_redo() {
        let mut tl = make_timeline();
        let mut history = History::default();
        history.execute(Box::new(RemoveClip::new(0)), &mut tl).unwrap();
        history.undo(&mut tl).unwrap();
        assert!(history.can_redo());
        history.execute(Box::new(RemoveClip::new(2)), &mut tl).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn recorded_drag_can_be_undone() {
        let mut tl = make_timeline();
        let mut history = History::default();
        tl.reorder(&[1, 2, 0]).unwrap();
        history.record(Box::new(ReorderClips::new(vec![1, 2, 0])));
        history.undo(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["a.png", "b.mp4", "c.gif"]);
    }

    #[test]
    fn empty_stacks_error() {
        let mut tl = Timeline::default();
        let mut history = History::default();
        assert!(matches!(history.undo(&mut tl), Err(CoreError::NothingToUndo)));
        assert!(matches!(history.redo(&mut tl), Err(CoreError::NothingToRedo)));
    }

    #[test]
    fn max_size_drops_oldest() {
        let mut tl = Timeline::default();
        let mut history = History::new(2);
        for i in 0..3 {
            history
                .execute(
                    Box::new(AppendClip::new(ClipEntry::new(format!("{i}.png")))),
                    &mut tl,
                )
                .unwrap();
        }
        history.undo(&mut tl).unwrap();
        history.undo(&mut tl).unwrap();
        assert!(!history.can_undo());
        assert_eq!(names(&tl), vec!["0.png"]);
    }
}
