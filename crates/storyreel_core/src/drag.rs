use crate::error::{CoreError, Result};
use crate::timeline::Timeline;
use tracing::{debug, warn};

/// Vertical extent of one rendered timeline row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryBounds {
    pub top: f64,
    pub height: f64,
}

impl EntryBounds {
    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Rows stacked top to bottom with no gaps.
pub fn stacked_rows(count: usize, row_height: f64) -> Vec<EntryBounds> {
    (0..count)
        .map(|i| EntryBounds {
            top: i as f64 * row_height,
            height: row_height,
        })
        .collect()
}

/// Where the dragged row goes among its siblings: before the first sibling
/// whose midpoint lies below the pointer, or after all of them.
pub fn insertion_point(pointer_y: f64, siblings: &[EntryBounds]) -> usize {
    siblings
        .iter()
        .position(|s| pointer_y < s.midpoint())
        .unwrap_or(siblings.len())
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    /// `order[i]` is the timeline index of the clip currently shown at row `i`.
    Dragging { origin: usize, order: Vec<usize> },
    /// Only observable while `finish` is applying the order to the timeline.
    Reordering,
}

/// Turns a single-pointer drag over the rendered rows into one reorder of
/// the timeline. Nothing touches the timeline until the drag completes.
#[derive(Debug)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// The visual order during a drag, as timeline indices.
    pub fn visual_order(&self) -> Option<&[usize]> {
        match &self.state {
            DragState::Dragging { order, .. } => Some(order),
            _ => None,
        }
    }

    /// Start dragging the row at `origin` out of `len` rows.
    pub fn begin(&mut self, origin: usize, len: usize) -> Result<()> {
        if !matches!(self.state, DragState::Idle) {
            return Err(CoreError::DragInProgress);
        }
        if origin >= len {
            return Err(CoreError::IndexOutOfRange { index: origin, len });
        }
        debug!(origin, len, "drag started");
        self.state = DragState::Dragging {
            origin,
            order: (0..len).collect(),
        };
        Ok(())
    }

    /// Pointer moved to `pointer_y` while over the rows laid out as `rows`
    /// (one entry per row in current visual order, dragged row included).
    /// Returns true if the visual order changed.
    pub fn pointer_moved(&mut self, pointer_y: f64, rows: &[EntryBounds]) -> bool {
        let DragState::Dragging { origin, order } = &mut self.state else {
            return false;
        };
        if rows.len() != order.len() {
            warn!(
                rows = rows.len(),
                entries = order.len(),
                "row layout does not match drag state, ignoring move"
            );
            return false;
        }
        let Some(current) = order.iter().position(|&i| i == *origin) else {
            return false;
        };

        let siblings: Vec<EntryBounds> = rows
            .iter()
            .enumerate()
            .filter(|(row, _)| *row != current)
            .map(|(_, bounds)| *bounds)
            .collect();
        let target = insertion_point(pointer_y, &siblings);
        if target == current {
            return false;
        }

        let dragged = order.remove(current);
        order.insert(target, dragged);
        true
    }

    /// Abort the drag. The timeline is not touched.
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Complete the drag and apply the final visual order to `timeline`.
    ///
    /// Returns the applied order, or `None` if nothing was being dragged or
    /// the order did not change.
    pub fn finish(&mut self, timeline: &mut Timeline) -> Result<Option<Vec<usize>>> {
        let order = match std::mem::replace(&mut self.state, DragState::Reordering) {
            DragState::Dragging { order, .. } => order,
            _ => {
                self.state = DragState::Idle;
                return Ok(None);
            }
        };

        let unchanged = order.iter().enumerate().all(|(pos, &i)| pos == i);
        let result = if unchanged {
            Ok(None)
        } else {
            timeline.reorder(&order).map(|()| Some(order))
        };

        self.state = DragState::Idle;
        result
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClipEntry;

    fn make_timeline(n: usize) -> Timeline {
        let mut tl = Timeline::default();
        for i in 0..n {
            tl.append(ClipEntry::new(format!("{i}.png"))).unwrap();
        }
        tl
    }

    fn names(tl: &Timeline) -> Vec<String> {
        tl.iter().map(|c| c.filename.clone()).collect()
    }

    #[test]
    fn insertion_point_uses_midpoints() {
        let rows = stacked_rows(3, 10.0);
        assert_eq!(insertion_point(0.0, &rows), 0);
        assert_eq!(insertion_point(4.9, &rows), 0);
        assert_eq!(insertion_point(5.0, &rows), 1);
        assert_eq!(insertion_point(24.0, &rows), 2);
        assert_eq!(insertion_point(25.0, &rows), 3);
        assert_eq!(insertion_point(100.0, &[]), 0);
    }

    #[test]
    fn drag_first_to_end() {
        let mut tl = make_timeline(3);
        let mut drag = DragController::new();
        drag.begin(0, tl.len()).unwrap();

        assert!(drag.pointer_moved(100.0, &stacked_rows(3, 10.0)));
        assert_eq!(drag.visual_order(), Some(&[1, 2, 0][..]));

        let applied = drag.finish(&mut tl).unwrap();
        assert_eq!(applied, Some(vec![1, 2, 0]));
        assert_eq!(names(&tl), vec!["1.png", "2.png", "0.png"]);
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn drag_last_to_front() {
        let mut tl = make_timeline(4);
        let mut drag = DragController::new();
        drag.begin(3, tl.len()).unwrap();
        assert!(drag.pointer_moved(1.0, &stacked_rows(4, 10.0)));
        drag.finish(&mut tl).unwrap();
        assert_eq!(names(&tl), vec!["3.png", "0.png", "1.png", "2.png"]);
    }

    #[test]
    fn repeated_moves_track_dragged_row() {
        let mut tl = make_timeline(3);
        let mut drag = DragController::new();
        let rows = stacked_rows(3, 10.0);
        drag.begin(0, 3).unwrap();
        // Past the midpoint of row 1: lands between 1 and 2.
        assert!(drag.pointer_moved(16.0, &rows));
        assert_eq!(drag.visual_order(), Some(&[1, 0, 2][..]));
        // Hovering over its own new slot changes nothing.
        assert!(!drag.pointer_moved(16.0, &rows));
        // Back to the top.
        assert!(drag.pointer_moved(0.0, &rows));
        assert_eq!(drag.visual_order(), Some(&[0, 1, 2][..]));

        assert_eq!(drag.finish(&mut tl).unwrap(), None);
        assert_eq!(names(&tl), vec!["0.png", "1.png", "2.png"]);
    }

    #[test]
    fn cancel_leaves_timeline_unchanged() {
        let mut tl = make_timeline(3);
        let before = tl.clips().to_vec();
        let mut drag = DragController::new();
        drag.begin(0, 3).unwrap();
        drag.pointer_moved(100.0, &stacked_rows(3, 10.0));
        drag.cancel();
        assert_eq!(drag.finish(&mut tl).unwrap(), None);
        assert_eq!(tl.clips(), before.as_slice());
    }

    #[test]
    fn second_drag_is_rejected() {
        let mut drag = DragController::new();
        drag.begin(0, 2).unwrap();
        assert!(matches!(drag.begin(1, 2), Err(CoreError::DragInProgress)));
        assert!(drag.is_dragging());
    }

    #[test]
    fn begin_out_of_range() {
        let mut drag = DragController::new();
        assert!(matches!(
            drag.begin(2, 2),
            Err(CoreError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn moves_while_idle_are_ignored() {
        let mut drag = DragController::new();
        assert!(!drag.pointer_moved(5.0, &stacked_rows(2, 10.0)));
    }

    #[test]
    fn mismatched_layout_is_ignored() {
        let mut drag = DragController::new();
        drag.begin(0, 3).unwrap();
        assert!(!drag.pointer_moved(100.0, &stacked_rows(2, 10.0)));
        assert_eq!(drag.visual_order(), Some(&[0, 1, 2][..]));
    }

    #[test]
    fn timeline_changed_during_drag_is_left_alone() {
        let mut tl = make_timeline(2);
        let mut drag = DragController::new();
        drag.begin(0, 2).unwrap();
        drag.pointer_moved(100.0, &stacked_rows(2, 10.0));
        tl.append(ClipEntry::new("late.png")).unwrap();

        assert!(matches!(
            drag.finish(&mut tl),
            Err(CoreError::InvalidPermutation(_))
        ));
        assert_eq!(names(&tl), vec!["0.png", "1.png", "late.png"]);
        assert_eq!(drag.state(), &DragState::Idle);
    }
}
