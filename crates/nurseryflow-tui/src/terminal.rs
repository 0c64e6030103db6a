use std::io::{Stdout, stdout};

use anyhow::{Context, Result, anyhow};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub(crate) struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub(crate) fn enter() -> Result<Self> {
        let terminal = enter_with_ops(
            || enable_raw_mode().context("failed to enable raw mode"),
            || {
                let mut out = stdout();
                execute!(out, EnterAlternateScreen, Hide)
                    .context("failed to enter alternate screen")
            },
            || {
                let backend = CrosstermBackend::new(stdout());
                Terminal::new(backend).context("failed to create terminal backend")
            },
            || {
                let mut out = stdout();
                execute!(out, Show, LeaveAlternateScreen)
                    .context("failed to restore terminal screen")
            },
            || disable_raw_mode().context("failed to disable raw mode"),
        )?;
        Ok(Self { terminal })
    }

    pub(crate) fn draw<F>(&mut self, draw_fn: F) -> Result<()>
    where
        F: FnOnce(&mut ratatui::Frame<'_>),
    {
        self.terminal
            .draw(draw_fn)
            .context("failed to render terminal")?;
        Ok(())
    }

    pub(crate) fn autoresize(&mut self) -> Result<()> {
        self.terminal
            .autoresize()
            .context("failed to autoresize terminal")
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.terminal.backend_mut(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    RawMode,
    AltScreen,
}

/// Runs terminal setup in order. When a later stage fails, every stage that
/// already succeeded is undone in reverse and cleanup failures are appended to
/// the original error.
fn enter_with_ops<T, EnableRaw, EnterAlt, CreateTerminal, LeaveAlt, DisableRaw>(
    mut enable_raw: EnableRaw,
    mut enter_alt: EnterAlt,
    mut create_terminal: CreateTerminal,
    mut leave_alt: LeaveAlt,
    mut disable_raw: DisableRaw,
) -> Result<T>
where
    EnableRaw: FnMut() -> Result<()>,
    EnterAlt: FnMut() -> Result<()>,
    CreateTerminal: FnMut() -> Result<T>,
    LeaveAlt: FnMut() -> Result<()>,
    DisableRaw: FnMut() -> Result<()>,
{
    let mut entered = Vec::with_capacity(2);

    enable_raw()?;
    entered.push(Stage::RawMode);

    let outcome = enter_alt().and_then(|()| {
        entered.push(Stage::AltScreen);
        create_terminal()
    });

    let setup_error = match outcome {
        Ok(terminal) => return Ok(terminal),
        Err(error) => error,
    };

    let mut cleanup_failures = Vec::new();
    for stage in entered.iter().rev() {
        let undone = match stage {
            Stage::AltScreen => leave_alt(),
            Stage::RawMode => disable_raw(),
        };
        if let Err(error) = undone {
            cleanup_failures.push(format!("{error:#}"));
        }
    }

    if cleanup_failures.is_empty() {
        Err(setup_error)
    } else {
        Err(anyhow!(
            "{setup_error:#}\nterminal rollback failed: {}",
            cleanup_failures.join("; ")
        ))
    }
}
