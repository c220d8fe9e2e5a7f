//! Front-end adapter for the history panel
//!
//! Any front-end (GUI, TUI, CLI) drives the engine through this surface:
//! read display rows, then send commands back. Rows are addressed by their
//! text, which is unique in the history; CLI front-ends can resolve a
//! 1-based display index with [`Panel::text_at`].

use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

use crate::clipboard_history::{ClipboardAccess, HistoryEngine};
use crate::error::ClipboardAccessError;

/// One line of the panel, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    /// 1-based position in the panel
    pub index: usize,
    pub text: String,
    pub preview: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCommand {
    TogglePin(String),
    Remove(String),
    /// Copy the entry back to the clipboard and close the panel
    Select(String),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    /// History changed; re-render rows
    Refresh,
    /// Selection done; hide the panel
    Dismiss,
    /// Nothing happened (entry no longer present)
    Unchanged,
}

pub struct Panel<C: ClipboardAccess> {
    engine: Arc<HistoryEngine>,
    clipboard: C,
}

impl<C: ClipboardAccess> Panel<C> {
    pub fn new(engine: Arc<HistoryEngine>, clipboard: C) -> Self {
        Self { engine, clipboard }
    }

    pub fn engine(&self) -> &Arc<HistoryEngine> {
        &self.engine
    }

    /// Current rows: pinned first, newest first within each group.
    pub fn rows(&self) -> Vec<PanelRow> {
        self.engine
            .list_for_display()
            .into_iter()
            .enumerate()
            .map(|(i, entry)| PanelRow {
                index: i + 1,
                preview: entry.preview(),
                text: entry.text,
                pinned: entry.pinned,
            })
            .collect()
    }

    /// Text of the row at 1-based `index` in the current display order.
    pub fn text_at(&self, index: usize) -> Option<String> {
        let position = index.checked_sub(1)?;
        self.engine
            .list_for_display()
            .into_iter()
            .nth(position)
            .map(|entry| entry.text)
    }

    pub fn apply(&mut self, command: PanelCommand) -> Result<PanelOutcome, ClipboardAccessError> {
        let changed = match command {
            PanelCommand::TogglePin(text) => self.engine.toggle_pin(&text),
            PanelCommand::Remove(text) => self.engine.remove(&text),
            PanelCommand::Clear => self.engine.clear() > 0,
            PanelCommand::Select(text) => {
                let Some(selected) = self.engine.select(&text) else {
                    return Ok(PanelOutcome::Unchanged);
                };
                self.clipboard.write(&selected)?;
                info!(text_len = selected.len(), "Copied history entry to clipboard");
                return Ok(PanelOutcome::Dismiss);
            }
        };

        Ok(if changed {
            PanelOutcome::Refresh
        } else {
            PanelOutcome::Unchanged
        })
    }

    /// Non-blocking notice to show when saves keep failing.
    pub fn notice(&self) -> Option<&'static str> {
        self.engine
            .persistent_save_failure()
            .then_some("Clipboard history is not being saved to disk")
    }

    /// Plain-text rendering for terminal front-ends.
    pub fn render(&self) -> String {
        let rows = self.rows();
        let mut out = String::new();
        if let Some(notice) = self.notice() {
            let _ = writeln!(out, "! {}", notice);
        }
        if rows.is_empty() {
            out.push_str("(clipboard history is empty)\n");
            return out;
        }
        for row in rows {
            let marker = if row.pinned { "*" } else { " " };
            let preview = row.preview.replace('\n', " ");
            let _ = writeln!(out, "{:>3}.{} {}", row.index, marker, preview);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard_history::FakeClipboard;

    fn panel_with(texts: &[&str]) -> (Panel<FakeClipboard>, FakeClipboard) {
        let engine = Arc::new(HistoryEngine::new(30));
        for text in texts {
            engine.add(text);
        }
        let clipboard = FakeClipboard::default();
        (Panel::new(engine, clipboard.clone()), clipboard)
    }

    #[test]
    fn test_rows_are_in_display_order() {
        let (mut panel, _) = panel_with(&["A", "B", "C"]);
        panel
            .apply(PanelCommand::TogglePin("B".to_string()))
            .unwrap();

        let rows = panel.rows();
        let texts: Vec<_> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "C", "A"]);
        assert_eq!(rows[0].index, 1);
        assert!(rows[0].pinned);
        assert!(!rows[1].pinned);
    }

    #[test]
    fn test_text_at_resolves_display_index() {
        let (panel, _) = panel_with(&["old", "new"]);
        assert_eq!(panel.text_at(1).as_deref(), Some("new"));
        assert_eq!(panel.text_at(2).as_deref(), Some("old"));
        assert_eq!(panel.text_at(0), None);
        assert_eq!(panel.text_at(3), None);
    }

    #[test]
    fn test_select_writes_clipboard_and_dismisses() {
        let (mut panel, clipboard) = panel_with(&["pick me"]);
        let outcome = panel
            .apply(PanelCommand::Select("pick me".to_string()))
            .unwrap();

        assert_eq!(outcome, PanelOutcome::Dismiss);
        assert_eq!(clipboard.writes(), vec!["pick me".to_string()]);
        // Selection does not reorder or duplicate the history
        assert_eq!(panel.engine().len(), 1);
    }

    #[test]
    fn test_select_missing_entry_is_unchanged() {
        let (mut panel, clipboard) = panel_with(&[]);
        let outcome = panel
            .apply(PanelCommand::Select("gone".to_string()))
            .unwrap();
        assert_eq!(outcome, PanelOutcome::Unchanged);
        assert!(clipboard.writes().is_empty());
    }

    #[test]
    fn test_select_propagates_clipboard_failure() {
        let (mut panel, clipboard) = panel_with(&["x"]);
        clipboard.fail_writes();
        let result = panel.apply(PanelCommand::Select("x".to_string()));
        assert!(matches!(result, Err(ClipboardAccessError::Write(_))));
    }

    #[test]
    fn test_remove_and_clear_outcomes() {
        let (mut panel, _) = panel_with(&["a", "b"]);
        assert_eq!(
            panel.apply(PanelCommand::Remove("a".to_string())).unwrap(),
            PanelOutcome::Refresh
        );
        assert_eq!(
            panel.apply(PanelCommand::Remove("a".to_string())).unwrap(),
            PanelOutcome::Unchanged
        );
        assert_eq!(
            panel.apply(PanelCommand::Clear).unwrap(),
            PanelOutcome::Refresh
        );
        assert_eq!(
            panel.apply(PanelCommand::Clear).unwrap(),
            PanelOutcome::Unchanged
        );
    }

    #[test]
    fn test_render_marks_pins_and_flattens_newlines() {
        let (mut panel, _) = panel_with(&["line one\nline two", "plain"]);
        panel
            .apply(PanelCommand::TogglePin("plain".to_string()))
            .unwrap();

        let rendered = panel.render();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines, vec!["  1.* plain", "  2.  line one line two"]);
    }

    #[test]
    fn test_render_empty_history() {
        let (panel, _) = panel_with(&[]);
        assert_eq!(panel.render(), "(clipboard history is empty)\n");
        assert_eq!(panel.notice(), None);
    }
}
