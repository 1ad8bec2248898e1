use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::controls::StatusSnapshot;

const CONTROLS_HELP: &str = "space=play/pause  s=stop  ←/→=seek 5s  1-9=select  m=mute  o=solo  -/= volume  [/] master  q=quit";

pub fn draw_status(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    status: &StatusSnapshot,
    log_lines: &[String],
) {
    let _ = terminal.draw(|f| {
        let stems_height = status.stem_lines.len().max(1) as u16 + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(stems_height),
                Constraint::Min(0),
            ])
            .split(f.size());

        let controls = Paragraph::new(CONTROLS_HELP)
            .style(Style::default().fg(Color::Blue))
            .block(Block::default().borders(Borders::ALL).title("stemdeck"));
        f.render_widget(controls, chunks[0]);

        let status_widget = Paragraph::new(status.text.as_str())
            .style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL).title("Playback"));
        f.render_widget(status_widget, chunks[1]);

        let stem_lines: Vec<Line> = if status.stem_lines.is_empty() {
            vec![Line::from("No stems loaded.")]
        } else {
            status
                .stem_lines
                .iter()
                .enumerate()
                .map(|(index, line)| {
                    let style = if index == status.selected {
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    Line::styled(line.as_str(), style)
                })
                .collect()
        };
        let stems_widget = Paragraph::new(stem_lines)
            .block(Block::default().borders(Borders::ALL).title("Stems"));
        f.render_widget(stems_widget, chunks[2]);

        let log_height = chunks[3].height.saturating_sub(2) as usize;
        let start = log_lines.len().saturating_sub(log_height);
        let log_text = if log_lines.is_empty() {
            "No logs yet.".to_string()
        } else {
            log_lines[start..].join("\n")
        };

        let log_widget = Paragraph::new(log_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(log_widget, chunks[3]);
    });
}
