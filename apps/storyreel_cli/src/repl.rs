use crate::state::EditorState;
use crate::view::timeline_table;
use anyhow::{bail, Context, Result};
use std::cell::Cell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use storyreel_core::drag::{stacked_rows, DragController, EntryBounds};
use storyreel_core::history::{RemoveClip, ReorderClips, UpdateClipField};
use storyreel_core::timeline::TimelineEvent;
use storyreel_core::types::ClipField;
use storyreel_preview::preview::{PreviewController, PreviewStatus, PreviewSurface};

const ROW_HEIGHT: f64 = 24.0;

const HELP: &str = "\
commands:
  list                          show the timeline
  drag <from> <to>              drag a row to a new position
  move <from> <to>              move a clip directly
  order <i,j,k,...>             apply a full new order
  set <index> <field> <value>   duration | keepAudio | startTransition | endTransition | filter
  remove <index>                remove a clip
  undo | redo
  preview <index>               preview a clip
  save                          write the session file
  quit                          save pending changes and leave";

#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    List,
    Drag { from: usize, to: usize },
    Move { from: usize, to: usize },
    Order(Vec<usize>),
    Set { index: usize, change: ClipField },
    Remove(usize),
    Undo,
    Redo,
    Preview(usize),
    Save,
    Help,
    Quit,
}

impl EditCommand {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Ok(None);
        };

        let cmd = match (verb, args) {
            ("list" | "ls", []) => EditCommand::List,
            ("drag", [from, to]) => EditCommand::Drag {
                from: index(from)?,
                to: index(to)?,
            },
            ("move" | "mv", [from, to]) => EditCommand::Move {
                from: index(from)?,
                to: index(to)?,
            },
            ("order", [list]) => EditCommand::Order(
                list.split(',')
                    .filter(|s| !s.is_empty())
                    .map(index)
                    .collect::<Result<_>>()?,
            ),
            ("set", [i, field, value @ ..]) if !value.is_empty() => EditCommand::Set {
                index: index(i)?,
                change: ClipField::parse(field, &value.join(" "))?,
            },
            ("remove" | "rm", [i]) => EditCommand::Remove(index(i)?),
            ("undo", []) => EditCommand::Undo,
            ("redo", []) => EditCommand::Redo,
            ("preview" | "p", [i]) => EditCommand::Preview(index(i)?),
            ("save", []) => EditCommand::Save,
            ("help" | "?", []) => EditCommand::Help,
            ("quit" | "exit" | "q", []) => EditCommand::Quit,
            _ => bail!("unrecognized command: {}", line.trim()),
        };
        Ok(Some(cmd))
    }
}

fn index(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .with_context(|| format!("expected a clip index, got {s:?}"))
}

/// Simulate a pointer drag of row `from` so that it lands at `to`, then
/// record the resulting reorder in the history.
pub fn drag_row(state: &mut EditorState, from: usize, to: usize) -> Result<bool> {
    let len = state.timeline.len();
    if to >= len {
        bail!("no clip at index {to} (timeline has {len})");
    }

    let mut drag = DragController::new();
    drag.begin(from, len)?;

    let rows = stacked_rows(len, ROW_HEIGHT);
    let siblings: Vec<EntryBounds> = rows
        .iter()
        .enumerate()
        .filter(|(row, _)| *row != from)
        .map(|(_, bounds)| *bounds)
        .collect();
    // Resting on a sibling's midpoint puts the dragged row after it.
    let pointer_y = match to {
        0 => 0.0,
        n => siblings[n - 1].midpoint(),
    };
    drag.pointer_moved(pointer_y, &rows);

    match drag.finish(&mut state.timeline)? {
        Some(order) => {
            state.history.record(Box::new(ReorderClips::new(order)));
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Run one command. Returns `false` when the loop should stop.
pub fn apply<S: PreviewSurface>(
    state: &mut EditorState,
    preview: &mut PreviewController<S>,
    cmd: EditCommand,
    out: &mut impl Write,
) -> Result<bool> {
    match cmd {
        EditCommand::List => write!(out, "{}", timeline_table(state.timeline.clips()))?,
        EditCommand::Drag { from, to } => {
            if !drag_row(state, from, to)? {
                writeln!(out, "order unchanged")?;
            }
        }
        EditCommand::Move { from, to } => {
            let len = state.timeline.len();
            if from >= len || to >= len {
                bail!("move {from} -> {to} is out of range (timeline has {len})");
            }
            state.history.execute(
                Box::new(ReorderClips::moving(len, from, to)),
                &mut state.timeline,
            )?;
        }
        EditCommand::Order(order) => {
            state
                .history
                .execute(Box::new(ReorderClips::new(order)), &mut state.timeline)?;
        }
        EditCommand::Set { index, change } => {
            state
                .history
                .execute(Box::new(UpdateClipField::new(index, change)), &mut state.timeline)?;
        }
        EditCommand::Remove(index) => {
            state
                .history
                .execute(Box::new(RemoveClip::new(index)), &mut state.timeline)?;
        }
        EditCommand::Undo => {
            let what = state.history.undo_description().unwrap_or_default().to_string();
            state.history.undo(&mut state.timeline)?;
            writeln!(out, "undid: {what}")?;
        }
        EditCommand::Redo => {
            let what = state.history.redo_description().unwrap_or_default().to_string();
            state.history.redo(&mut state.timeline)?;
            writeln!(out, "redid: {what}")?;
        }
        EditCommand::Preview(index) => match preview.preview(&state.timeline, index) {
            PreviewStatus::Showing { kind, .. } => {
                writeln!(out, "previewing clip {index} ({})", kind.as_str())?
            }
            PreviewStatus::Placeholder => writeln!(out, "[preview unavailable]")?,
        },
        EditCommand::Save => {
            state.save()?;
            writeln!(out, "saved {}", state.path().display())?;
        }
        EditCommand::Help => writeln!(out, "{HELP}")?,
        EditCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Interactive edit loop. The timeline is redrawn after every change, and
/// changes made since the last save are written when the loop ends cleanly.
pub fn run<S: PreviewSurface>(
    state: &mut EditorState,
    preview: &mut PreviewController<S>,
    input: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    let unsaved = Rc::new(Cell::new(false));
    let subscription = state.timeline.subscribe(Box::new({
        let unsaved = Rc::clone(&unsaved);
        move |event: &TimelineEvent, clips: &[storyreel_core::types::ClipEntry]| {
            unsaved.set(true);
            println!("{}", describe(event));
            print!("{}", timeline_table(clips));
        }
    }));

    writeln!(out, "{}", timeline_table(state.timeline.clips()))?;
    writeln!(out, "type 'help' for commands")?;

    let result = (|| -> Result<()> {
        for line in input.lines() {
            let line = line?;
            let cmd = match EditCommand::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "error: {e:#}")?;
                    continue;
                }
            };
            let saving = matches!(cmd, EditCommand::Save);
            match apply(state, preview, cmd, &mut out) {
                Ok(true) if saving => unsaved.set(false),
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => writeln!(out, "error: {e:#}")?,
            }
            out.flush()?;
        }
        Ok(())
    })();

    // Quit and end of input both land here.
    let result = result.and_then(|()| {
        if unsaved.get() {
            state.save()?;
            writeln!(out, "saved {}", state.path().display())?;
        }
        Ok(())
    });

    state.timeline.unsubscribe(subscription);
    preview.clear();
    result
}

fn describe(event: &TimelineEvent) -> String {
    match event {
        TimelineEvent::Appended { index } => format!("added clip {index}"),
        TimelineEvent::Inserted { index } => format!("restored clip {index}"),
        TimelineEvent::Removed { index } => format!("removed clip {index}"),
        TimelineEvent::Reordered => "reordered".to_string(),
        TimelineEvent::FieldUpdated { index, field } => format!("clip {index}: {field} changed"),
        TimelineEvent::Replaced => "timeline replaced".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use storyreel_core::limits::EditorLimits;
    use storyreel_core::types::{ClipEntry, Filter};
    use storyreel_preview::error::Result as PreviewResult;
    use tempfile::TempDir;

    #[derive(Default)]
    struct NullSurface;

    impl PreviewSurface for NullSurface {
        fn show_image(&mut self, _path: &Path, _duration: f64) -> PreviewResult<()> {
            Ok(())
        }
        fn play(&mut self, _path: &Path) -> PreviewResult<()> {
            Ok(())
        }
        fn teardown(&mut self) -> PreviewResult<()> {
            Ok(())
        }
    }

    fn state_with(dir: &TempDir, names: &[&str]) -> EditorState {
        let mut state =
            EditorState::load(dir.path().join("s.json"), EditorLimits::strict()).unwrap();
        for name in names {
            state.timeline.append(ClipEntry::new(*name)).unwrap();
        }
        state
    }

    fn names(state: &EditorState) -> Vec<&str> {
        state.timeline.iter().map(|c| c.filename.as_str()).collect()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(EditCommand::parse("   ").unwrap(), None);
        assert_eq!(
            EditCommand::parse("drag 0 2").unwrap(),
            Some(EditCommand::Drag { from: 0, to: 2 })
        );
        assert_eq!(
            EditCommand::parse("order 2,0,1").unwrap(),
            Some(EditCommand::Order(vec![2, 0, 1]))
        );
        assert_eq!(
            EditCommand::parse("set 1 filter oil_painting").unwrap(),
            Some(EditCommand::Set {
                index: 1,
                change: ClipField::Filter(Filter::OilPainting)
            })
        );
        assert!(EditCommand::parse("drag one two").is_err());
        assert!(EditCommand::parse("set 1 colour red").is_err());
        assert!(EditCommand::parse("dance").is_err());
    }

    #[test]
    fn drag_lands_at_every_target() {
        let dir = TempDir::new().unwrap();
        for from in 0..4 {
            for to in 0..4 {
                let mut state = state_with(&dir, &["a", "b", "c", "d"]);
                let moved = names(&state)[from].to_string();
                drag_row(&mut state, from, to).unwrap();
                assert_eq!(names(&state)[to], moved, "drag {from} -> {to}");
            }
        }
    }

    #[test]
    fn drag_is_undoable() {
        let dir = TempDir::new().unwrap();
        let mut state = state_with(&dir, &["a", "b", "c"]);
        assert!(drag_row(&mut state, 0, 2).unwrap());
        assert_eq!(names(&state), vec!["b", "c", "a"]);
        state.history.undo(&mut state.timeline).unwrap();
        assert_eq!(names(&state), vec!["a", "b", "c"]);
        assert!(!drag_row(&mut state, 1, 1).unwrap());
        assert!(drag_row(&mut state, 0, 3).is_err());
    }

    #[test]
    fn session_script_runs() {
        let dir = TempDir::new().unwrap();
        let mut state = state_with(&dir, &["a.png", "b.png", "c.png"]);
        let mut preview = PreviewController::new(NullSurface, dir.path());
        let script =
            "move 2 0\nset 0 duration 7\nset 0 duration 400\nremove 1\nundo\nsave\nquit\nlist\n";
        let mut out = Vec::new();

        run(&mut state, &mut preview, script.as_bytes(), &mut out).unwrap();

        assert_eq!(names(&state), vec!["c.png", "a.png", "b.png"]);
        assert_eq!(state.timeline.get(0).unwrap().duration, 7.0);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("error:"));
        assert!(printed.contains("undid: Remove clip"));
        assert!(dir.path().join("s.json").exists());
    }

    #[test]
    fn quit_saves_pending_changes() {
        let dir = TempDir::new().unwrap();
        let mut state = state_with(&dir, &["a.png", "b.png", "c.png"]);
        let mut preview = PreviewController::new(NullSurface, dir.path());
        let mut out = Vec::new();

        run(&mut state, &mut preview, "remove 0\nquit\n".as_bytes(), &mut out).unwrap();

        assert!(String::from_utf8(out).unwrap().contains("saved"));
        let reloaded =
            EditorState::load(dir.path().join("s.json"), EditorLimits::strict()).unwrap();
        assert_eq!(names(&reloaded), vec!["b.png", "c.png"]);
    }

    #[test]
    fn end_of_input_saves_but_clean_sessions_are_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.json");
        let mut preview = PreviewController::new(NullSurface, dir.path());

        let mut state = EditorState::load(&path, EditorLimits::strict()).unwrap();
        run(&mut state, &mut preview, "list\nset 9 duration 2\n".as_bytes(), Vec::new()).unwrap();
        assert!(!path.exists());

        state.timeline.append(ClipEntry::new("a.png")).unwrap();
        state.save().unwrap();
        run(&mut state, &mut preview, "set 0 filter neon\n".as_bytes(), Vec::new()).unwrap();
        let reloaded = EditorState::load(&path, EditorLimits::strict()).unwrap();
        assert_eq!(reloaded.timeline.get(0).unwrap().filter, Filter::Neon);

        let mut out = Vec::new();
        run(&mut state, &mut preview, "save\nquit\n".as_bytes(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().matches("saved").count(), 1);
    }
}
