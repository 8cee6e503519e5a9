use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Paragraph, Row, Table, TableState, Tabs},
};
use serde_json::Value;
use tracing::{debug, error, warn};

use tabview::record::display_value;
use tabview::{Message, Renderer, TableError, ViewModel};

use crate::inputter::Inputter;
use crate::keys::Action;

pub const CMDLINE_HEIGH: u16 = 1;
pub const TABS_HEIGHT: u16 = 1;
pub const TABLE_CHROME_HEIGHT: u16 = 3; // Borders plus header row
pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const MAX_COLUMN_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modus {
    Table,
    Search,
}

/// Terminal projection of the table view.
pub struct TableUI {
    name: String,
    view: Option<ViewModel>,
    modus: Modus,
    input: Inputter,
    table_state: TableState,
    cursor_column: usize,
    page_height: usize,
    status_message: String,
    last_status_message_update: Instant,
    exit: bool,
}

impl TableUI {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            view: None,
            modus: Modus::Table,
            input: Inputter::default(),
            table_state: TableState::default(),
            cursor_column: 0,
            page_height: 1,
            status_message: "Loading ...".to_string(),
            last_status_message_update: Instant::now(),
            exit: false,
        }
    }

    pub fn exiting(&self) -> bool {
        self.exit
    }

    /// The search box wants every key untouched.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Search
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    /// Updates local cursor state and turns the action into a table message
    /// where one is needed.
    pub fn update(&mut self, action: Action) -> Option<Message> {
        let view = self.view.as_ref()?;
        match action {
            Action::Quit => {
                self.exit = true;
                None
            }
            Action::NextTab => self.step_tab(1),
            Action::PreviousTab => self.step_tab(-1),
            Action::MoveLeft => {
                self.cursor_column = self.cursor_column.saturating_sub(1);
                None
            }
            Action::MoveRight => {
                if self.cursor_column + 1 < view.columns.len() {
                    self.cursor_column += 1;
                }
                None
            }
            Action::MoveUp => self.move_rows(-1),
            Action::MoveDown => self.move_rows(1),
            Action::MovePageUp => self.move_rows(-(self.page_height as isize)),
            Action::MovePageDown => self.move_rows(self.page_height as isize),
            Action::MoveBeginning => self.move_rows(isize::MIN),
            Action::MoveEnd => self.move_rows(isize::MAX),
            Action::Sort => view
                .columns
                .get(self.cursor_column)
                .map(|c| Message::SortRequested(c.clone())),
            Action::SearchInColumn => view
                .columns
                .get(self.cursor_column)
                .map(|c| Message::SearchColumnChanged(c.clone())),
            Action::StartSearch => {
                let term = view.search_term.clone();
                self.input.clear();
                self.input.set(&term);
                self.modus = Modus::Search;
                None
            }
            Action::RawKey(key) => {
                let current = view.search_term.clone();
                let result = self.input.read(key);
                if result.canceled {
                    self.modus = Modus::Table;
                    return Some(Message::SearchTermChanged(String::new()));
                }
                if result.finished {
                    self.modus = Modus::Table;
                }
                (result.input != current).then_some(Message::SearchTermChanged(result.input))
            }
        }
    }

    fn step_tab(&mut self, step: isize) -> Option<Message> {
        let view = self.view.as_ref()?;
        let partitions = view.partitions.as_ref()?;
        let current = view.active_partition_index().unwrap_or(0) as isize;
        let next = (current + step).rem_euclid(partitions.len() as isize) as usize;
        partitions
            .get(next)
            .map(|p| Message::TabSelected(p.clone()))
    }

    fn move_rows(&mut self, step: isize) -> Option<Message> {
        let nrows = self.view.as_ref().map_or(0, |v| v.rows.len());
        if nrows == 0 {
            self.table_state.select(None);
            return None;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = current.saturating_add(step).clamp(0, nrows as isize - 1);
        self.table_state.select(Some(next as usize));
        None
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let has_tabs = self
            .view
            .as_ref()
            .is_some_and(|v| v.partitions.is_some());
        let tabs_height = if has_tabs { TABS_HEIGHT } else { 0 };
        let [tabs_area, table_area, cmd_area] = Layout::vertical([
            Constraint::Length(tabs_height),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        self.page_height = table_area
            .height
            .saturating_sub(TABLE_CHROME_HEIGHT)
            .max(1) as usize;

        if let Some(view) = &self.view {
            if let Some(partitions) = &view.partitions {
                let tabs = Tabs::new(partitions.iter().map(|p| p.to_string()))
                    .select(view.active_partition_index().unwrap_or(0))
                    .highlight_style(Style::new().reversed());
                frame.render_widget(tabs, tabs_area);
            }
            let table = self.build_table(view);
            frame.render_stateful_widget(table, table_area, &mut self.table_state);
        } else {
            let block = Block::bordered().title(Line::from(format!(" {} ", self.name).bold()));
            frame.render_widget(Paragraph::new("Loading ...").block(block), table_area);
        }

        self.draw_cmdline(frame, cmd_area);
    }

    fn build_table<'a>(&self, view: &'a ViewModel) -> Table<'a> {
        let cells: Vec<Vec<String>> = view
            .rows
            .iter()
            .map(|row| {
                view.columns
                    .iter()
                    .map(|c| cell_text(row.record.get(c).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        let widths: Vec<Constraint> = view
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let content = cells
                    .iter()
                    .map(|r| r[idx].chars().count())
                    .max()
                    .unwrap_or(0);
                let width = (name.chars().count() + 2).max(content) + COLUMN_WIDTH_MARGIN;
                Constraint::Length(width.min(MAX_COLUMN_WIDTH) as u16)
            })
            .collect();

        let header = Row::new(view.columns.iter().enumerate().map(|(idx, name)| {
            let icon = match &view.sort_column {
                Some(sorted) if sorted == name => view.sort_direction.icon(),
                _ => " ",
            };
            let mut label = format!("{icon} {name}");
            if view.search_column.as_deref() == Some(name.as_str()) {
                label.push_str(" /");
            }
            let cell = Cell::from(label);
            if idx == self.cursor_column {
                cell.reversed()
            } else {
                cell
            }
        }))
        .bold()
        .underlined();

        let rows = cells.into_iter().map(Row::new);
        let title = format!(
            " {} [{}/{}] ",
            self.name,
            view.rows.len(),
            view.total_rows
        );

        Table::new(rows, widths)
            .column_spacing(1)
            .header(header)
            .block(Block::bordered().title(Line::from(title.bold()).centered()))
            .row_highlight_style(Style::new().bg(Color::Blue))
    }

    fn draw_cmdline(&self, frame: &mut Frame, area: Rect) {
        if self.modus == Modus::Search {
            let input = self.input.get();
            let line = Line::from(vec!["/".blue().bold(), Span::raw(input.input)]);
            frame.render_widget(Paragraph::new(line), area);
            frame.set_cursor_position(Position::new(
                area.x + 1 + input.curser_pos as u16,
                area.y,
            ));
            return;
        }

        let search = self
            .view
            .as_ref()
            .and_then(|v| {
                v.search_column
                    .as_ref()
                    .map(|c| format!(" {c}: \"{}\" ", v.search_term))
            })
            .unwrap_or_default();
        let line = Line::from(vec![
            " Search".blue().bold(),
            search.into(),
            "| ".into(),
            self.status_message.clone().yellow(),
            " | Tabs ".into(),
            "<[ ]>".blue().bold(),
            " Sort ".into(),
            "<s>".blue().bold(),
            " Find ".into(),
            "</>".blue().bold(),
            " Quit ".into(),
            "<q>".blue().bold(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

impl Renderer for TableUI {
    fn render(&mut self, view: &ViewModel) {
        debug!(
            "Render {} of {} rows, {} columns",
            view.rows.len(),
            view.total_rows,
            view.columns.len()
        );
        self.cursor_column = self
            .cursor_column
            .min(view.columns.len().saturating_sub(1));
        let selected = match self.table_state.selected() {
            _ if view.rows.is_empty() => None,
            Some(idx) => Some(idx.min(view.rows.len() - 1)),
            None => Some(0),
        };
        self.table_state.select(selected);
        self.set_status_message(format!("{} rows", view.rows.len()));
        self.view = Some(view.clone());
    }

    fn render_error(&mut self, error: &TableError) {
        if error.is_load_error() {
            error!("{error}");
        } else {
            warn!("{error}");
        }
        self.set_status_message(error.to_string());
    }
}

fn cell_text(value: &Value) -> String {
    display_value(value)
        .replace("\r\n", " ↵ ")
        .replace('\n', " ↵ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};
    use serde_json::json;
    use tabview::{Partition, SortDirection, TableConfig, TableController, source::MemorySource};

    fn loaded_ui() -> (TableController, TableUI) {
        let source = MemorySource::from_json(json!([
            {"type": "A", "name": "x", "note": "line\nbreak"},
            {"type": "B", "name": "y", "note": ""},
            {"type": "A", "name": "z", "note": ""},
        ]))
        .unwrap();
        let mut controller =
            TableController::new(TableConfig::default().with_partition_key("type".to_string()));
        let mut ui = TableUI::new("test");
        futures::executor::block_on(controller.load(&source, &mut ui)).unwrap();
        (controller, ui)
    }

    fn screen(ui: &mut TableUI) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|f| ui.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draws_tabs_and_rows() {
        let (_, mut ui) = loaded_ui();
        let content = screen(&mut ui);
        assert!(content.contains("All"));
        assert!(content.contains("name"));
        assert!(content.contains("[3/3]"));
        assert!(content.contains("↵"));
    }

    #[test]
    fn draws_loading_placeholder() {
        let mut ui = TableUI::new("test");
        assert!(screen(&mut ui).contains("Loading"));
        assert_eq!(ui.update(Action::Sort), None);
    }

    #[test]
    fn actions_become_messages() {
        let (mut controller, mut ui) = loaded_ui();
        assert_eq!(
            ui.update(Action::NextTab),
            Some(Message::TabSelected(Partition::Value(json!("A"))))
        );
        assert_eq!(
            ui.update(Action::PreviousTab),
            Some(Message::TabSelected(Partition::Value(json!("B"))))
        );
        let sort = ui.update(Action::Sort).unwrap();
        assert_eq!(sort, Message::SortRequested("name".to_string()));
        controller.handle(sort, &mut ui).unwrap();
        let view = controller.view().unwrap();
        assert_eq!(view.sort_direction, SortDirection::Descending);
    }

    #[test]
    fn search_box_updates_term_live() {
        use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
        let (mut controller, mut ui) = loaded_ui();
        assert_eq!(ui.update(Action::StartSearch), None);
        assert!(ui.raw_keyevents());

        let key = KeyEvent::new(KeyCode::Char('Z'), KeyModifiers::NONE);
        let message = ui.update(Action::RawKey(key)).unwrap();
        assert_eq!(message, Message::SearchTermChanged("Z".to_string()));
        controller.handle(message, &mut ui).unwrap();
        assert!(screen(&mut ui).contains("[1/3]"));

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(
            ui.update(Action::RawKey(esc)),
            Some(Message::SearchTermChanged(String::new()))
        );
        assert!(!ui.raw_keyevents());
    }

    #[test]
    fn row_cursor_is_clamped() {
        let (_, mut ui) = loaded_ui();
        ui.update(Action::MoveEnd);
        assert_eq!(ui.table_state.selected(), Some(2));
        ui.update(Action::MoveDown);
        assert_eq!(ui.table_state.selected(), Some(2));
        ui.update(Action::MoveBeginning);
        assert_eq!(ui.table_state.selected(), Some(0));
    }
}
