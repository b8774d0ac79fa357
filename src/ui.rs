use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::domain::UTConfig;
use crate::model::{Model, UIData};

pub const FILTERBAR_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const POPUP_WIDTH_PERCENT: u16 = 60;
const POPUP_HEIGHT_PERCENT: u16 = 80;

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(config: &UTConfig) -> Self {
        Self {
            max_column_width: config.max_column_width,
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(FILTERBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Self::filter_bar(uidata), filter_area);
        frame.render_widget(self.table(uidata), table_area);
        frame.render_widget(Self::status_line(uidata), status_area);

        if uidata.show_popup {
            let area = Self::popup_area(frame.area(), POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT);
            let popup = Paragraph::new(uidata.popup_message.as_str())
                .block(Block::bordered().title(Line::from(" Help ".bold()).centered()));
            frame.render_widget(Clear, area);
            frame.render_widget(popup, area);
        }
    }

    fn filter_bar(uidata: &UIData) -> Paragraph<'_> {
        let mut spans = Vec::new();
        for filter in uidata.filters.iter() {
            let mut style = Style::default();
            if filter.active {
                style = style.fg(Color::Yellow);
            }
            if filter.focused {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::raw(format!(" {}：", filter.label)));
            spans.push(Span::styled(format!("[{}]", filter.text), style));
        }
        if uidata.filter_mode {
            spans.push(" ↑↓ change  ←→ switch  Enter keep  Esc revert".dark_gray());
        }
        Paragraph::new(Line::from(spans))
    }

    fn table<'a>(&self, uidata: &'a UIData) -> Table<'a> {
        let header = Row::new(
            uidata
                .table
                .iter()
                .enumerate()
                .map(|(cidx, column)| {
                    let cell = Cell::from(column.name.as_str()).bold();
                    if cidx == uidata.selected_column {
                        cell.underlined()
                    } else {
                        cell
                    }
                }),
        );

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|ridx| {
            let cells = uidata.table.iter().enumerate().map(|(cidx, column)| {
                let cell = Cell::from(column.data[ridx].as_str());
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    cell.reversed()
                } else {
                    cell
                }
            });
            let row = Row::new(cells);
            if ridx == uidata.selected_row {
                row.style(Style::default().bg(Color::DarkGray))
            } else {
                row
            }
        });

        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(std::cmp::min(c.width, self.max_column_width) as u16));

        Table::new(rows, widths).header(header).column_spacing(1)
    }

    fn status_line(uidata: &UIData) -> Paragraph<'_> {
        let mut spans = vec![
            format!(" {} ", uidata.name).bold(),
            format!(" {}/{} rows ", uidata.nrows, uidata.total_rows).blue(),
            format!(" row {} ", uidata.abs_selected_row + 1).into(),
            format!(" {} ", uidata.sort_description).into(),
        ];
        if !uidata.selected_label.is_empty() {
            spans.push(format!(" {} ", uidata.selected_label).yellow());
        }
        spans.push(format!(" {}", uidata.status_message).dark_gray());
        Paragraph::new(Line::from(spans))
    }

    fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
        let [area] = vertical.areas(area);
        let [area] = horizontal.areas(area);
        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use crate::table::TableSource;
    use ratatui::{Terminal, backend::TestBackend};

    fn rendered(model: &Model, width: u16, height: u16) -> String {
        let ui = TableUI::new(&UTConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model() -> Model {
        let source = TableSource {
            headers: vec!["name".into(), "city".into(), "录取率".into()],
            rows: vec![
                vec![Some("alpha".into()), Some("x".into()), Some("45%".into())],
                vec![Some("beta".into()), Some("y".into()), Some("20%".into())],
            ],
            numeric: vec![false; 3],
        };
        let mut model = Model::init(&UTConfig::default(), 100, 12).unwrap();
        model.attach_source("demo", &source).unwrap();
        model
    }

    #[test]
    fn draws_table_and_status() {
        let model = model();
        let screen = rendered(&model, 100, 12);
        assert!(screen.contains("alpha"));
        assert!(screen.contains("2/2 rows"));
        assert!(screen.contains("unsorted"));
        assert!(screen.contains("⇅"));
    }

    #[test]
    fn draws_sort_indicator_and_help() {
        let mut model = model();
        model.update(Some(Message::SortColumn(2))).unwrap();
        let screen = rendered(&model, 100, 12);
        assert!(screen.contains("↑"));
        assert!(screen.contains("sorted by"));
        assert!(!screen.contains("Help"));

        model.update(Some(Message::Help)).unwrap();
        assert!(rendered(&model, 100, 12).contains("Help"));
    }

    #[test]
    fn popup_is_centered() {
        let area = TableUI::popup_area(Rect::new(0, 0, 100, 50), 60, 80);
        assert_eq!(area, Rect::new(20, 5, 60, 40));
    }
}
