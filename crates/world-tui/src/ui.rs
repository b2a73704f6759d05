use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};
use world_core::Phase;

use crate::app::App;

const PLACEHOLDER: &str = "Initialising greeting...";

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    let (header_area, vibe_area, output_area, button_area, footer_area) =
        (chunks[0], chunks[1], chunks[2], chunks[3], chunks[4]);

    // Header
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            " Gemini Powered ",
            Style::default().fg(Color::Black).bg(Color::Magenta),
        )),
        Line::from(Span::styled(
            "World Generator",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Say hello to the world in any dimension.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(header, header_area);

    // Vibe selector
    let labels: Vec<Line> = app.presets().map(|p| Line::from(p.label.clone())).collect();
    let vibes = Tabs::new(labels)
        .block(Block::default().borders(Borders::ALL).title("Vibe"))
        .select(app.selected_index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        );
    f.render_widget(vibes, vibe_area);

    // Output
    let state = app.state();
    let output = if state.message().is_empty() {
        Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        let color = match state.phase() {
            Phase::Failed => Color::Red,
            _ => Color::Cyan,
        };
        Paragraph::new(state.message()).style(Style::default().fg(color))
    };
    let output = output
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Greeting"));
    f.render_widget(output, output_area);

    // Generate button
    let button = match state.is_loading() {
        true => Paragraph::new(format!("{} Transmitting...", app.spinner_frame()))
            .style(Style::default().fg(Color::DarkGray)),
        false => Paragraph::new("Generate New World")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    };
    let button = button
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, button_area);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("Built with Gemini 3 Flash", Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            "←/→ vibe · Enter generate · q quit",
            Style::default().fg(Color::Gray),
        ),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(footer, footer_area);
}
