use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    style::Print,
    terminal::{self, ClearType},
    QueueableCommand,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cli::output::OutputOptions;
use crate::cli::renderer;
use crate::cli::settings_panel::{self, PanelAction, PanelCursor, RawModeGuard};
use crate::core::analyzer;
use crate::core::app_state::{listen_for_usage_updates, AppState, InitialLoad, Tab};
use crate::core::backend::ccusage::CcusageBackend;
use crate::core::backend::{monitor, BackendError, UsageBackend};
use crate::core::formatter::status_line;
use crate::core::models::settings::AppSettings;
use crate::core::models::usage::UsageSnapshot;

const KEY_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Redraw,
    Refresh,
    SaveSettings,
    Hide,
    Show,
    Quit,
}

/// Map a key press to a command, applying tab switches and settings edits
/// to the state directly.
fn command_for(state: &mut AppState, pos: &mut PanelCursor, key: KeyEvent) -> Command {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
            return Command::Quit
        }
        (KeyCode::Char('r'), _) => return Command::Refresh,
        (KeyCode::Char('h'), _) => return Command::Hide,
        (KeyCode::Char('s'), _) => return Command::Show,
        (KeyCode::Char('1'), _) => state.tab = Tab::Dashboard,
        (KeyCode::Char('2'), _) => state.tab = Tab::Trends,
        (KeyCode::Char('3'), _) => {
            state.tab = Tab::Settings;
            if let Some(editor) = state.settings() {
                *pos = PanelCursor::on_selection(editor);
            }
        }
        (code, _) if state.tab == Tab::Settings => {
            let action = match state.settings_mut() {
                Some(editor) => settings_panel::handle_key(editor, pos, code),
                None => PanelAction::None,
            };
            match action {
                PanelAction::Save => return Command::SaveSettings,
                PanelAction::Cancel => state.cancel_settings(),
                PanelAction::None => {}
            }
        }
        _ => {}
    }
    Command::Redraw
}

/// Result of backend work run off the UI task.
#[derive(Debug)]
enum Completion {
    Initialized(InitialLoad),
    Refreshed(Result<UsageSnapshot, BackendError>),
    Saved(AppSettings, Result<(), BackendError>),
}

enum Job {
    Initialize,
    Refresh,
    Save(AppSettings),
}

fn spawn_job<B: UsageBackend + 'static>(
    backend: &Arc<B>,
    job: Job,
    done: &mpsc::UnboundedSender<Completion>,
) {
    let backend = Arc::clone(backend);
    let done = done.clone();
    tokio::spawn(async move {
        let completion = match job {
            Job::Initialize => Completion::Initialized(InitialLoad::fetch(backend.as_ref()).await),
            Job::Refresh => Completion::Refreshed(backend.get_usage_data().await),
            Job::Save(settings) => {
                let result = backend.update_settings(settings.clone()).await;
                Completion::Saved(settings, result)
            }
        };
        // The loop has exited when nobody is listening
        let _ = done.send(completion);
    });
}

/// Mark the state as busy and start the backend call for `command`. Only
/// one load is in flight at a time.
fn start<B: UsageBackend + 'static>(
    state: &mut AppState,
    backend: &Arc<B>,
    done: &mpsc::UnboundedSender<Completion>,
    command: Command,
) {
    match command {
        Command::Refresh if state.is_loading() => debug!("load already in flight"),
        Command::Refresh if state.needs_initialize() => {
            state.begin_initialize();
            spawn_job(backend, Job::Initialize, done);
        }
        Command::Refresh => {
            if state.begin_refresh() {
                spawn_job(backend, Job::Refresh, done);
            }
        }
        Command::SaveSettings => {
            if let Some(pending) = state.pending_settings() {
                spawn_job(backend, Job::Save(pending), done);
            }
        }
        _ => {}
    }
}

/// Fold a finished job into the state. A successful save starts a refresh.
fn complete<B: UsageBackend + 'static>(
    state: &mut AppState,
    backend: &Arc<B>,
    done: &mpsc::UnboundedSender<Completion>,
    completion: Completion,
) {
    match completion {
        Completion::Initialized(load) => state.finish_initialize(load),
        Completion::Refreshed(result) => state.finish_refresh(result),
        Completion::Saved(saved, result) => {
            if state.finish_save(saved, result) && !state.is_loading() && state.begin_refresh() {
                spawn_job(backend, Job::Refresh, done);
            }
        }
    }
}

/// Next pushed snapshot. Pends forever when there is no subscription, so the
/// select loop keeps serving keys in pull-only mode.
async fn next_update(rx: &mut Option<broadcast::Receiver<UsageSnapshot>>) -> UsageSnapshot {
    if let Some(receiver) = rx.as_mut() {
        loop {
            match receiver.recv().await {
                Ok(snapshot) => return snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "usage updates lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
    *rx = None;
    std::future::pending().await
}

/// Forward key presses from the blocking crossterm reader until the
/// receiving side goes away.
fn read_keys(tx: mpsc::Sender<KeyEvent>) -> io::Result<()> {
    while !tx.is_closed() {
        if !event::poll(KEY_POLL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && tx.blocking_send(key).is_err() {
                break;
            }
        }
    }
    Ok(())
}

fn redraw(state: &AppState, visible: bool, pos: PanelCursor, use_color: bool) -> io::Result<()> {
    let body = if visible {
        let analysis = state.analysis(analyzer::system_today());
        renderer::render_app(state, analysis.as_ref(), Some(pos.row()), use_color)
    } else {
        "  Window hidden. Press s to show it again.".to_string()
    };

    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveTo(0, 0))?
        .queue(terminal::Clear(ClearType::All))?;
    for line in body.lines() {
        stdout.queue(Print(format!("{}\r\n", line)))?;
    }
    stdout.queue(Print("\r\n"))?;
    if let Some(snapshot) = state.snapshot() {
        stdout.queue(Print(format!("  {}\r\n", status_line(snapshot))))?;
    }
    stdout.queue(Print(
        "  1-3: tabs | r: refresh | h: hide | s: show | q: quit\r\n",
    ))?;
    stdout.flush()
}

/// Live dashboard: initial load, pushed updates from the monitor and
/// keyboard control until `q`.
pub async fn run(opts: &OutputOptions) -> Result<()> {
    if !io::stdout().is_terminal() {
        eprintln!("`umon watch` needs a terminal. Use `umon dashboard` instead.");
        std::process::exit(1);
    }

    let backend = Arc::new(CcusageBackend::from_default_config());
    let mut updates = listen_for_usage_updates(backend.as_ref());
    let monitor = monitor::spawn(Arc::clone(&backend));

    let _guard = RawModeGuard::enable()?;
    let (key_tx, mut key_rx) = mpsc::channel(16);
    let reader = tokio::task::spawn_blocking(move || read_keys(key_tx));

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut state = AppState::default();
    let mut pos = PanelCursor::default();
    let use_color = opts.use_color;

    start(&mut state, &backend, &done_tx, Command::Refresh);
    redraw(&state, backend.is_window_visible(), pos, use_color)?;

    loop {
        tokio::select! {
            snapshot = next_update(&mut updates) => {
                debug!("applying pushed usage update");
                state.apply_push(snapshot);
            }
            Some(completion) = done_rx.recv() => {
                let first_load = matches!(completion, Completion::Initialized(_));
                complete(&mut state, &backend, &done_tx, completion);
                if let (true, Some(editor)) = (first_load, state.settings()) {
                    pos = PanelCursor::on_selection(editor);
                }
            }
            key = key_rx.recv() => {
                let Some(key) = key else { break };
                match command_for(&mut state, &mut pos, key) {
                    Command::Quit => break,
                    Command::Redraw => {}
                    Command::Hide => {
                        if let Err(e) = backend.hide_window().await {
                            warn!("{}", e);
                        }
                    }
                    Command::Show => {
                        if let Err(e) = backend.show_window().await {
                            warn!("{}", e);
                        }
                    }
                    command => start(&mut state, &backend, &done_tx, command),
                }
            }
        }
        redraw(&state, backend.is_window_visible(), pos, use_color)?;
    }

    monitor.abort();
    drop(key_rx);
    match reader.await {
        Ok(Err(e)) => warn!("key reader failed: {}", e),
        Err(e) => warn!("key reader task failed: {}", e),
        Ok(Ok(())) => {}
    }

    let mut stdout = io::stdout();
    stdout
        .queue(cursor::MoveTo(0, 0))?
        .queue(terminal::Clear(ClearType::All))?;
    stdout.flush()?;
    Ok(())
}
