mod keymap;
mod pick_flow;
mod scout_flow;
mod shell;
mod submit;
mod terminal;
mod theme;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use nurseryflow_app::App;
use pick_flow::PickScreen;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Color;
use ratatui::text::{Line, Text};
use ratatui::widgets::{List, ListItem, ListState};
use scout_flow::ScoutScreen;
use terminal::TerminalSession;
use tracing::debug;

use crate::ui::modal::render_error_modal;
use crate::ui::text::{
    compact_hint, focus_line, key_hint_height, key_hint_paragraph, wrapped_paragraph,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Completed,
    BackAtRoot,
    Canceled,
}

/// What the interactive session needs beyond the store: where background
/// submissions persist and who is operating the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub ledger_path: PathBuf,
    pub operator: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootMenuExit {
    Action(RootAction),
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootAction {
    Pick,
    Scout,
}

impl RootAction {
    fn title(self) -> &'static str {
        match self {
            Self::Pick => "Pick an order",
            Self::Scout => "Scout a location",
        }
    }
}

const ROOT_ACTIONS: [RootAction; 2] = [RootAction::Pick, RootAction::Scout];

#[derive(Debug)]
struct RootScreen {
    selected: usize,
}

impl RootScreen {
    fn new() -> Self {
        Self { selected: 0 }
    }

    fn on_key(&mut self, key: KeyEvent) -> Option<RootMenuExit> {
        if keymap::is_back(key) || keymap::is_quit(key) {
            return Some(RootMenuExit::Exit);
        }

        if keymap::is_up(key) {
            self.selected = self.selected.saturating_sub(1);
            return None;
        }

        if keymap::is_down(key) {
            if self.selected + 1 < ROOT_ACTIONS.len() {
                self.selected += 1;
            }
            return None;
        }

        if keymap::is_confirm(key) {
            return Some(RootMenuExit::Action(ROOT_ACTIONS[self.selected]));
        }

        None
    }

    fn render(&self, frame: &mut ratatui::Frame<'_>, ctx: &RunContext) {
        let area = frame.area();
        let key_text = compact_hint(
            area.width,
            "Enter: select    Up/Down or j/k: move    Esc/q: exit",
            "Enter: select    j/k: move    Esc/q: exit",
            "Enter: select | j/k: move | Esc/q: exit",
        );
        let footer_height = key_hint_height(area.width, key_text);
        let [header, body, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(6),
                Constraint::Length(footer_height),
            ])
            .areas(area);

        let header_text = Text::from(vec![
            Line::from(format!("nurseryflow    operator: {}", ctx.operator)),
            Line::from(format!("ledger: {}", ctx.ledger_path.display())),
            focus_line("Choose what you want to do"),
        ]);
        frame.render_widget(
            wrapped_paragraph(header_text).block(theme::chrome("Home")),
            header,
        );

        let items: Vec<ListItem<'_>> = ROOT_ACTIONS
            .iter()
            .map(|action| ListItem::new(action.title()))
            .collect();
        let list = List::new(items)
            .block(theme::chrome(focus_line("Actions")))
            .highlight_style(theme::table_highlight(Color::Cyan));

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, body, &mut state);

        frame.render_widget(
            key_hint_paragraph(key_text).block(theme::key_block()),
            footer,
        );
    }
}

enum ActiveScreen {
    Root(RootScreen),
    Pick(Box<PickScreen>),
    Scout(Box<ScoutScreen>),
}

enum Transition {
    Open(RootAction),
    Return(UiExit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainReason {
    Timeout,
    AfterInput,
}

/// A screen with background submissions to poll between key events.
trait RootLoopTickTarget {
    fn on_tick(&mut self);
    fn should_drain_after_input(&self) -> bool;
}

impl RootLoopTickTarget for PickScreen {
    fn on_tick(&mut self) {
        PickScreen::on_tick(self);
    }

    fn should_drain_after_input(&self) -> bool {
        self.is_submitting()
    }
}

impl RootLoopTickTarget for ScoutScreen {
    fn on_tick(&mut self) {
        ScoutScreen::on_tick(self);
    }

    fn should_drain_after_input(&self) -> bool {
        self.is_submitting()
    }
}

fn root_loop_drain_helper<T: RootLoopTickTarget>(target: &mut T, reason: DrainReason) -> bool {
    if !matches!(reason, DrainReason::Timeout) && !target.should_drain_after_input() {
        return false;
    }

    target.on_tick();
    true
}

fn root_loop_drain_active(active: &mut ActiveScreen, reason: DrainReason) -> bool {
    match active {
        ActiveScreen::Root(_) => false,
        ActiveScreen::Pick(screen) => root_loop_drain_helper(screen.as_mut(), reason),
        ActiveScreen::Scout(screen) => root_loop_drain_helper(screen.as_mut(), reason),
    }
}

pub fn run_root(app: &App<'_>, ctx: &RunContext) -> Result<UiExit> {
    let mut session = TerminalSession::enter()?;
    let mut active = ActiveScreen::Root(RootScreen::new());
    let mut global_error: Option<String> = None;
    const TICK_RATE: Duration = Duration::from_millis(120);

    loop {
        session.draw(|frame| {
            match &active {
                ActiveScreen::Root(screen) => screen.render(frame, ctx),
                ActiveScreen::Pick(screen) => screen.render(frame),
                ActiveScreen::Scout(screen) => screen.render(frame),
            }

            if let Some(message) = global_error.as_deref() {
                render_global_error(frame, message);
            }
        })?;

        let has_event = event::poll(TICK_RATE).context("failed to poll terminal event")?;
        if !has_event {
            root_loop_drain_active(&mut active, DrainReason::Timeout);
            continue;
        }

        let event = event::read().context("failed to read terminal event")?;
        let key = match event {
            Event::Resize(_, _) => {
                session.autoresize()?;
                continue;
            }
            Event::Key(key) if matches!(key.kind, KeyEventKind::Press) => key,
            _ => continue,
        };

        if keymap::is_ctrl_c(key) {
            return Ok(UiExit::Canceled);
        }

        if global_error.is_some() {
            if keymap::is_confirm(key) || keymap::is_back(key) {
                global_error = None;
            }
            continue;
        }

        let transition = match &mut active {
            ActiveScreen::Root(screen) => match screen.on_key(key) {
                Some(RootMenuExit::Action(action)) => Some(Transition::Open(action)),
                Some(RootMenuExit::Exit) => Some(Transition::Return(UiExit::Completed)),
                None => None,
            },
            ActiveScreen::Pick(screen) => match screen.on_key(key, app) {
                Ok(value) => value.map(Transition::Return),
                Err(error) => {
                    global_error = Some(format!("{error:#}"));
                    None
                }
            },
            ActiveScreen::Scout(screen) => match screen.on_key(key, app) {
                Ok(value) => value.map(Transition::Return),
                Err(error) => {
                    global_error = Some(format!("{error:#}"));
                    None
                }
            },
        };

        if let Some(transition) = transition {
            match transition {
                Transition::Open(action) => {
                    debug!(?action, "opening screen");
                    match action {
                        RootAction::Pick => {
                            match PickScreen::new(app, &ctx.ledger_path, &ctx.operator) {
                                Ok(screen) => active = ActiveScreen::Pick(Box::new(screen)),
                                Err(error) => global_error = Some(format!("{error:#}")),
                            }
                        }
                        RootAction::Scout => {
                            match ScoutScreen::new(app, &ctx.ledger_path, &ctx.operator) {
                                Ok(screen) => active = ActiveScreen::Scout(Box::new(screen)),
                                Err(error) => global_error = Some(format!("{error:#}")),
                            }
                        }
                    };
                }
                Transition::Return(UiExit::Canceled) => return Ok(UiExit::Canceled),
                Transition::Return(UiExit::Completed) => return Ok(UiExit::Completed),
                Transition::Return(UiExit::BackAtRoot) => {
                    active = ActiveScreen::Root(RootScreen::new());
                }
            }
        }

        root_loop_drain_active(&mut active, DrainReason::AfterInput);
    }
}

fn render_global_error(frame: &mut ratatui::Frame<'_>, message: &str) {
    let text = format!("Operation failed.\n\n{message}");
    render_error_modal(frame, &text, "Enter/Esc: continue");
}

pub(crate) fn centered_rect(
    percent_x: u16,
    percent_y: u16,
    area: ratatui::layout::Rect,
) -> ratatui::layout::Rect {
    let pct_x = percent_x.min(100);
    let pct_y = percent_y.min(100);

    let [_, vertical, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .areas(area);
    let [_, horizontal, _] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .areas(vertical);
    horizontal
}
