use std::io::{self, IsTerminal, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    style::Print,
    terminal::{self, ClearType},
    ExecutableCommand, QueueableCommand,
};

use crate::cli::renderer;
use crate::core::models::settings::PollingFrequency;
use crate::core::settings_state::SettingsEditor;

/// Frequency rows followed by the auto start row.
pub const ROW_COUNT: usize = 4;
const AUTO_START_ROW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Save,
    Cancel,
}

/// Row of the settings panel under the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelCursor(usize);

impl PanelCursor {
    /// Start on the row of the currently selected frequency.
    pub fn on_selection(editor: &SettingsEditor) -> Self {
        let row = PollingFrequency::all()
            .iter()
            .position(|f| f.id() == editor.local().polling_frequency)
            .unwrap_or(0);
        Self(row)
    }

    pub fn row(&self) -> usize {
        self.0
    }
}

/// Apply one key press to the editor. Shared by `settings edit` and the
/// settings tab of `watch`.
pub fn handle_key(
    editor: &mut SettingsEditor,
    cursor: &mut PanelCursor,
    code: KeyCode,
) -> PanelAction {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            cursor.0 = cursor.0.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if cursor.0 + 1 < ROW_COUNT {
                cursor.0 += 1;
            }
        }
        KeyCode::Char(' ') => {
            if cursor.0 == AUTO_START_ROW {
                let auto_start = editor.local().auto_start;
                editor.set_auto_start(!auto_start);
            } else if let Some(freq) = PollingFrequency::all().get(cursor.0) {
                editor.set_polling_frequency(*freq);
            }
        }
        KeyCode::Enter => return PanelAction::Save,
        KeyCode::Esc | KeyCode::Char('c') => return PanelAction::Cancel,
        _ => {}
    }
    PanelAction::None
}

/// RAII guard that restores terminal state on drop (even on panic).
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        io::stdout().execute(cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = io::stdout().execute(cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

/// Edit settings in place. Returns `Ok(Some(action))` once the user saves
/// or cancels, `Ok(None)` if not a TTY.
pub fn interactive_edit(editor: &mut SettingsEditor) -> anyhow::Result<Option<PanelAction>> {
    if !io::stdin().is_terminal() {
        return Ok(None);
    }

    let _guard = RawModeGuard::enable()?;
    let mut pos = PanelCursor::on_selection(editor);
    draw(editor, pos)?;

    loop {
        if let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        {
            let action = match (code, modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
                    PanelAction::Cancel
                }
                _ => handle_key(editor, &mut pos, code),
            };
            if action != PanelAction::None {
                clear_ui()?;
                return Ok(Some(action));
            }
            draw(editor, pos)?;
        }
    }
}

fn draw(editor: &SettingsEditor, pos: PanelCursor) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;

    let body = renderer::render_settings(editor, Some(pos.row()));
    let mut lines = 0;
    for line in body.lines() {
        stdout.queue(Print(format!("{}\r\n", line)))?;
        lines += 1;
    }
    stdout
        .queue(Print("\r\n"))?
        .queue(Print(
            "  up/down: move | space: select | enter: save | esc: cancel\r\n",
        ))?;
    lines += 2;

    stdout.queue(cursor::MoveUp(lines as u16))?;
    stdout.flush()?;
    Ok(())
}

// draw() leaves the cursor on the panel's first line
fn clear_ui() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveToColumn(0))?
        .queue(terminal::Clear(ClearType::FromCursorDown))?;
    stdout.flush()?;
    Ok(())
}
