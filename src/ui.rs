use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListState, Paragraph, Row, Table, TableState, Tabs},
};

use crate::domain::DiamondConfig;
use crate::model::{ColumnView, Model, PickerView, Placeholder, UIData};
use crate::views::CellAlign;

pub const TABS_HEIGHT: usize = 1;
pub const FILTER_BAR_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;
/// Space and arrow after the label of the sorted column.
pub const SORT_ARROW_WIDTH: usize = 2;

const POPUP_WIDTH_PERCENT: u16 = 60;
const POPUP_HEIGHT_PERCENT: u16 = 80;

#[derive(Debug)]
pub struct TableUI {
    highlight: Style,
    header: Style,
}

impl TableUI {
    pub fn new(_cfg: &DiamondConfig) -> Self {
        Self {
            highlight: Style::default().add_modifier(Modifier::REVERSED),
            header: Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TABS_HEIGHT as u16),
                Constraint::Length(FILTER_BAR_HEIGHT as u16),
                Constraint::Min(1),
                Constraint::Length(STATUSLINE_HEIGHT as u16),
            ])
            .split(frame.area());

        self.render_tabs(frame, chunks[0], uidata);
        self.render_filter_bar(frame, chunks[1], uidata);
        match &uidata.placeholder {
            Some(placeholder) => self.render_placeholder(frame, chunks[2], placeholder),
            None => self.render_table(frame, chunks[2], uidata),
        }
        self.render_statusline(frame, chunks[3], uidata);

        if let Some(picker) = &uidata.picker {
            self.render_picker(frame, picker);
        }
        if uidata.show_popup {
            self.render_popup(frame, &uidata.popup_message);
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(24)])
            .split(area);

        let tabs = Tabs::new(uidata.tabs.iter().map(|t| Line::from(*t)))
            .select(uidata.active_tab)
            .highlight_style(self.highlight);
        frame.render_widget(tabs, cols[0]);

        let season = Line::from(vec![
            "Season ".into(),
            uidata.season_label.clone().bold(),
        ])
        .right_aligned();
        frame.render_widget(Paragraph::new(season), cols[1]);
    }

    fn render_filter_bar(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        let line = if !uidata.filterable {
            Line::from("No filters".dark_gray())
        } else if uidata.active_filters.is_empty() {
            Line::from(vec!["Filters: ".into(), "all".dark_gray(), "  (f to pick)".dark_gray()])
        } else {
            let mut spans: Vec<Span> = vec!["Filters: ".into()];
            for (idx, (label, value)) in uidata.active_filters.iter().enumerate() {
                if idx > 0 {
                    spans.push("  ".into());
                }
                spans.push(format!("{label}=").into());
                spans.push(value.clone().cyan().bold());
            }
            Line::from(spans)
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_placeholder(&self, frame: &mut Frame, area: Rect, placeholder: &Placeholder) {
        let text = match placeholder {
            Placeholder::NoSeasons => "No seasons found".to_string(),
            Placeholder::Loading => "Loading…".to_string(),
            Placeholder::NoData => "No data available".to_string(),
            Placeholder::Failed(e) => format!("Failed: {e}"),
        };
        let paragraph = Paragraph::new(Text::from(text))
            .centered()
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(paragraph, area);
    }

    fn aligned(content: &str, align: CellAlign) -> Line<'_> {
        match align {
            CellAlign::Left => Line::from(content).left_aligned(),
            CellAlign::Center => Line::from(content).centered(),
        }
    }

    fn header_cell(column: &ColumnView) -> Cell<'_> {
        let label = match column.sorted {
            Some(direction) => format!("{} {}", column.name, direction.arrow()),
            None => column.name.clone(),
        };
        let line = match column.align {
            CellAlign::Left => Line::from(label).left_aligned(),
            CellAlign::Center => Line::from(label).centered(),
        };
        Cell::from(line)
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        let header = Row::new(uidata.table.iter().map(Self::header_cell))
            .style(self.header)
            .height(TABLE_HEADER_HEIGHT as u16);

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|ridx| {
            Row::new(
                uidata
                    .table
                    .iter()
                    .map(|c| Cell::from(Self::aligned(&c.data[ridx], c.align))),
            )
        });
        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(self.highlight)
            .column_highlight_style(Style::default().add_modifier(Modifier::BOLD));

        let mut state = TableState::default()
            .with_selected(Some(uidata.selected_row))
            .with_selected_column(Some(uidata.selected_column));
        if nrows == 0 {
            state.select(None);
        }
        frame.render_stateful_widget(table, area, &mut state);

        if nrows == 0 && uidata.total_rows > 0 {
            let hint = Paragraph::new("No rows match the active filters".dark_gray()).centered();
            let below_header = Rect {
                y: area.y.saturating_add(TABLE_HEADER_HEIGHT as u16 + 1),
                height: 1.min(area.height),
                ..area
            };
            frame.render_widget(hint, below_header);
        }
    }

    fn render_statusline(&self, frame: &mut Frame, area: Rect, uidata: &UIData) {
        let position = format!(
            "row {}, showing {} of {} rows ",
            if uidata.nrows > 0 { uidata.abs_selected_row + 1 } else { 0 },
            uidata.nrows,
            uidata.total_rows
        );
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(position.len() as u16 + 12)])
            .split(area);

        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), cols[0]);
        let mut right = vec![Span::from(position)];
        if uidata.compact {
            right.push("[c] ".dark_gray());
        }
        right.push("? help".dark_gray());
        frame.render_widget(Paragraph::new(Line::from(right).right_aligned()), cols[1]);
    }

    fn render_picker(&self, frame: &mut Frame, picker: &PickerView) {
        let area = centered_rect(40, POPUP_HEIGHT_PERCENT, frame.area());
        frame.render_widget(Clear, area);

        let title = Line::from(
            picker
                .columns
                .iter()
                .enumerate()
                .flat_map(|(idx, label)| {
                    let span = if idx == picker.selected_column {
                        format!(" {label} ").reversed()
                    } else {
                        format!(" {label} ").into()
                    };
                    [span, Span::from("|")]
                })
                .collect::<Vec<Span>>(),
        );
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(Line::from(" h/l column  j/k value  Enter apply  Esc close ").centered());

        let list = List::new(picker.options.iter().map(String::as_str))
            .block(block)
            .highlight_style(self.highlight)
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(picker.selected_option));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_popup(&self, frame: &mut Frame, message: &str) {
        let area = centered_rect(POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT, frame.area());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(Text::from(message))
            .block(Block::bordered().title(Line::from(" Help ".bold()).centered()));
        frame.render_widget(paragraph, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
