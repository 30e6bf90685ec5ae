use std::sync::mpsc::Receiver;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::DefaultTerminal;
use ratatui::layout::{Position, Rect, Size};

use crate::config::Config;
use crate::confirm::ConfirmChoice;
use crate::kill::Terminator;
use crate::list::PortList;
use crate::lsof::{PortRecord, Snapshot, SnapshotSource};
use crate::ui::{self, ITEM_HEIGHT, Theme};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMode {
    Browsing,
    /// The record is captured at entry and stays fixed across refreshes.
    ConfirmingKill {
        record: PortRecord,
        choice: ConfirmChoice,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success(String),
    Failure(String),
}

/// Screen regions from the last draw, used to resolve pointer input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitRegions {
    pub list: Rect,
    pub yes: Option<Rect>,
    pub no: Option<Rect>,
}

pub struct App {
    running: bool,
    config: Config,
    list: PortList,
    mode: AppMode,
    status: Option<Status>,
    viewport: Size,
    regions: HitRegions,
    source: Box<dyn SnapshotSource>,
    terminator: Box<dyn Terminator>,
}

impl App {
    pub fn new(
        config: Config,
        source: Box<dyn SnapshotSource>,
        terminator: Box<dyn Terminator>,
    ) -> Self {
        let mut list = PortList::new();
        if let Some(filter) = &config.initial_filter {
            list.apply_filter(filter);
        }

        let mut app = Self {
            running: false,
            config,
            list,
            mode: AppMode::Browsing,
            status: None,
            viewport: Size::default(),
            regions: HitRegions::default(),
            source,
            terminator,
        };
        app.refresh();
        app
    }

    pub fn run(
        mut self,
        mut terminal: DefaultTerminal,
        snapshots: Receiver<Snapshot>,
        theme: &Theme,
    ) -> Result<()> {
        self.running = true;
        self.viewport = terminal.size()?;
        while self.running {
            terminal.draw(|frame| ui::render(frame, &mut self, theme))?;
            if event::poll(POLL_TIMEOUT)? {
                self.handle_event(event::read()?);
            }
            while let Ok(snapshot) = snapshots.try_recv() {
                self.on_snapshot(snapshot);
            }
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
            Event::Mouse(mouse) => self.on_mouse_event(mouse),
            Event::Resize(width, height) => self.on_resize(width, height),
            _ => {}
        }
    }

    /// Runs the snapshot provider synchronously and feeds the list.
    pub fn refresh(&mut self) {
        let snapshot = self.source.list_ports();
        self.on_snapshot(snapshot);
    }

    /// Replaces the list items. Never touches the mode, so a confirmation in
    /// progress keeps its captured record.
    pub fn on_snapshot(&mut self, snapshot: Snapshot) {
        let scope = &self.config.scope;
        let records: Vec<PortRecord> = snapshot
            .into_iter()
            .filter(|record| scope.matches(record))
            .collect();
        self.list.set_items(records);
    }

    pub fn list(&self) -> &PortList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut PortList {
        &mut self.list
    }

    pub fn mode(&self) -> &AppMode {
        &self.mode
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn regions(&self) -> HitRegions {
        self.regions
    }

    pub fn set_regions(&mut self, regions: HitRegions) {
        self.regions = regions;
    }

    fn on_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.quit();
            return;
        }

        match self.mode {
            AppMode::Browsing => self.on_browse_key(key),
            AppMode::ConfirmingKill { .. } => self.on_confirm_key(key),
        }
    }

    fn on_browse_key(&mut self, key: KeyEvent) {
        self.status = None;

        if self.list.is_filtering() {
            match key.code {
                KeyCode::Esc => self.list.reset_filter(),
                KeyCode::Enter => self.list.stop_filtering(),
                KeyCode::Backspace => self.list.pop_filter_char(),
                KeyCode::Up => self.list.move_up(),
                KeyCode::Down => self.list.move_down(),
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.list.push_filter_char(ch)
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc if !self.list.filter_text().is_empty() => self.list.reset_filter(),
            KeyCode::Esc => self.quit(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh(),
            KeyCode::Up | KeyCode::Char('k') => self.list.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.list.move_down(),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Char('/') => self.list.start_filtering(),
            KeyCode::Enter => self.begin_confirmation(),
            _ => {}
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.update_choice(ConfirmChoice::retreat),
            KeyCode::Right | KeyCode::Char('l') => self.update_choice(ConfirmChoice::advance),
            KeyCode::Tab | KeyCode::BackTab => self.update_choice(ConfirmChoice::toggle),
            KeyCode::Char('y') | KeyCode::Char('Y') => self.kill_selected(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.cancel_confirmation(),
            KeyCode::Enter => self.commit_confirmation(),
            _ => {}
        }
    }

    fn on_mouse_event(&mut self, mouse: MouseEvent) {
        let position = Position::new(mouse.column, mouse.row);
        let browsing = self.mode == AppMode::Browsing;

        match (browsing, mouse.kind) {
            (true, MouseEventKind::ScrollUp) => self.list.move_up(),
            (true, MouseEventKind::ScrollDown) => self.list.move_down(),
            (true, MouseEventKind::Up(MouseButton::Left)) => {
                if let Some(index) = self.row_at(position) {
                    self.status = None;
                    self.list.select(index);
                    self.begin_confirmation();
                }
            }
            (false, MouseEventKind::Up(MouseButton::Left)) => {
                if self.regions.yes.is_some_and(|area| area.contains(position)) {
                    self.kill_selected();
                } else if self.regions.no.is_some_and(|area| area.contains(position)) {
                    self.cancel_confirmation();
                }
            }
            _ => {}
        }
    }

    fn on_resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "terminal resized");
        self.viewport = Size::new(width, height);
    }

    fn row_at(&self, position: Position) -> Option<usize> {
        let area = self.regions.list;
        if !area.contains(position) {
            return None;
        }
        let row = usize::from((position.y - area.y) / ITEM_HEIGHT);
        let index = self.list.offset() + row;
        (index < self.list.visible_len()).then_some(index)
    }

    fn begin_confirmation(&mut self) {
        if let Some(item) = self.list.selected_item() {
            let record = item.record().clone();
            tracing::debug!(pid = %record.pid, port = %record.port, "confirming kill");
            self.mode = AppMode::ConfirmingKill {
                record,
                choice: ConfirmChoice::default(),
            };
        }
    }

    fn update_choice(&mut self, step: fn(ConfirmChoice) -> ConfirmChoice) {
        if let AppMode::ConfirmingKill { choice, .. } = &mut self.mode {
            *choice = step(*choice);
        }
    }

    fn commit_confirmation(&mut self) {
        let confirmed = match &self.mode {
            AppMode::ConfirmingKill { choice, .. } => choice.is_yes(),
            AppMode::Browsing => return,
        };
        if confirmed {
            self.kill_selected();
        } else {
            self.cancel_confirmation();
        }
    }

    fn cancel_confirmation(&mut self) {
        tracing::debug!("kill cancelled");
        self.mode = AppMode::Browsing;
    }

    fn kill_selected(&mut self) {
        let AppMode::ConfirmingKill { record, .. } =
            std::mem::replace(&mut self.mode, AppMode::Browsing)
        else {
            return;
        };

        tracing::info!(pid = %record.pid, port = %record.port, command = %record.command, "sending SIGKILL");
        match self.terminator.terminate(&record.pid) {
            Ok(()) => {
                tracing::info!(pid = %record.pid, "process killed");
                self.status = Some(Status::Success(format!(
                    "Killed {} ({}) on port :{}",
                    record.command, record.pid, record.port
                )));
            }
            Err(err) => {
                tracing::warn!(pid = %record.pid, "kill failed: {err}");
                self.status = Some(Status::Failure(format!(
                    "Could not kill port :{}: {err}",
                    record.port
                )));
            }
        }

        self.refresh();
        self.list.reset_filter();
    }

    fn quit(&mut self) {
        self.running = false;
    }
}
