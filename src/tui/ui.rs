//! Stateless rendering of the chess board and session panels.

use modelmate::BoardState;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use shakmaty::{File, Piece, Rank, Role, Square};

/// Board palette: light and dark square colors.
const LIGHT_SQUARE: Color = Color::Rgb(0xF0, 0xD9, 0xB5);
const DARK_SQUARE: Color = Color::Rgb(0xB5, 0x88, 0x63);

/// Renders the whole frame from the application state.
pub fn draw(frame: &mut Frame, app: &super::app::App) {
    let area = frame.area();
    let has_input = app.human_side().is_some();

    let mut constraints = vec![
        Constraint::Length(1),  // Title
        Constraint::Min(10),    // Board + panels
        Constraint::Length(3),  // Status
    ];
    if has_input {
        constraints.push(Constraint::Length(3)); // Input line
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let title = Paragraph::new("Modelmate")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    draw_main(frame, chunks[1], app);

    let status = Paragraph::new(app.status_message())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[2]);

    if has_input {
        let input = Paragraph::new(format!("> {}", app.input()))
            .block(Block::default().title("Your move").borders(Borders::ALL));
        frame.render_widget(input, chunks[3]);
    }
}

fn draw_main(frame: &mut Frame, area: Rect, app: &super::app::App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(area);

    draw_board(frame, columns[0], app.board());
    draw_panel(frame, columns[1], app);
}

fn draw_board(frame: &mut Frame, area: Rect, board: &BoardState) {
    let mut lines = Vec::with_capacity(9);
    for rank in (0..8).rev() {
        let mut spans = vec![Span::styled(
            format!("{} ", rank + 1),
            Style::default().fg(Color::DarkGray),
        )];
        for file in 0..8 {
            let square = Square::from_coords(File::new(file), Rank::new(rank));
            let background = if (file + rank) % 2 == 1 {
                LIGHT_SQUARE
            } else {
                DARK_SQUARE
            };
            let (symbol, foreground) = match board.piece_at(square) {
                Some(piece) => (piece_symbol(piece), piece_color(piece)),
                None => (' ', Color::Black),
            };
            spans.push(Span::styled(
                format!(" {} ", symbol),
                Style::default().fg(foreground).bg(background),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(Span::styled(
        "   a  b  c  d  e  f  g  h",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_panel(frame: &mut Frame, area: Rect, app: &super::app::App) {
    let training = app.human_side().is_some();
    let mut constraints = vec![Constraint::Min(5)];
    if training {
        constraints.push(Constraint::Length(6)); // Legal moves
    }
    constraints.push(Constraint::Length(5)); // Tally
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    // Move history, most recent last, wrapped into pairs per line.
    let mut history_lines = Vec::new();
    for (i, pair) in app.history().chunks(2).enumerate() {
        history_lines.push(Line::from(format!("{:>3}. {}", i + 1, pair.join("  "))));
    }
    let shown = history_lines
        .len()
        .saturating_sub(rows[0].height.saturating_sub(2) as usize);
    let history = Paragraph::new(Text::from(history_lines[shown..].to_vec()))
        .block(Block::default().title("Moves").borders(Borders::ALL));
    frame.render_widget(history, rows[0]);

    if training {
        let legal = Paragraph::new(app.board().legal_moves().join(" "))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Legal moves").borders(Borders::ALL));
        frame.render_widget(legal, rows[1]);
    }

    let tally = app.tally();
    let tally_text = vec![
        Line::from(format!("White wins: {}", tally.white_wins)),
        Line::from(format!("Black wins: {}", tally.black_wins)),
        Line::from(format!("Drawn:      {}", tally.draws)),
    ];
    let tally_widget = Paragraph::new(Text::from(tally_text))
        .block(Block::default().title("Tally").borders(Borders::ALL));
    frame.render_widget(tally_widget, rows[rows.len() - 1]);
}

fn piece_symbol(piece: Piece) -> char {
    match (piece.color.is_white(), piece.role) {
        (true, Role::Pawn) => '♙',
        (true, Role::Knight) => '♘',
        (true, Role::Bishop) => '♗',
        (true, Role::Rook) => '♖',
        (true, Role::Queen) => '♕',
        (true, Role::King) => '♔',
        (false, Role::Pawn) => '♟',
        (false, Role::Knight) => '♞',
        (false, Role::Bishop) => '♝',
        (false, Role::Rook) => '♜',
        (false, Role::Queen) => '♛',
        (false, Role::King) => '♚',
    }
}

fn piece_color(piece: Piece) -> Color {
    // White pieces draw dark on the wooden palette, black pieces light.
    if piece.color.is_white() {
        Color::Black
    } else {
        Color::White
    }
}
