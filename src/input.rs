//! Interactive single-line prompt.
//!
//! Used when a command needs free text the user did not pass on the command
//! line. Renders a small centered input box on the alternate screen.

use anyhow::{bail, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stderr};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

/// Ask for a line of text. `None` when the user cancels or submits nothing.
pub fn prompt_line(title: &str, hint: &str) -> Result<Option<String>> {
    if !atty::is(atty::Stream::Stdin) || !atty::is(atty::Stream::Stderr) {
        bail!("Input is required but stdin is not a terminal ({})", hint);
    }

    // Draw on stderr so stdout stays clean for the generated text.
    with_restore(
        || Ok(enable_raw_mode()?),
        || Ok(disable_raw_mode()?),
        || {
            with_restore(
                || {
                    let mut stderr = io::stderr();
                    Ok(execute!(stderr, EnterAlternateScreen)?)
                },
                || {
                    let mut stderr = io::stderr();
                    Ok(execute!(stderr, LeaveAlternateScreen)?)
                },
                || {
                    let mut terminal = Terminal::new(CrosstermBackend::new(io::stderr()))?;
                    run_input_loop(&mut terminal, title, hint)
                },
            )
        },
    )
}

/// Run `body` after `setup`. Once `setup` succeeds, `teardown` always runs;
/// an error from `body` wins over one from `teardown`.
fn with_restore<T>(
    setup: impl FnOnce() -> Result<()>,
    teardown: impl FnOnce() -> Result<()>,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    setup()?;
    let result = body();
    let restored = teardown();
    let value = result?;
    restored?;
    Ok(value)
}

fn run_input_loop(
    terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    title: &str,
    hint: &str,
) -> Result<Option<String>> {
    let mut input = Input::default();

    loop {
        terminal.draw(|frame| draw_ui(frame, &input, title, hint))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match key.code {
                KeyCode::Enter => {
                    let value = input.value().trim().to_string();
                    return Ok((!value.is_empty()).then_some(value));
                }
                KeyCode::Esc => return Ok(None),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                _ => {
                    input.handle_event(&Event::Key(key));
                }
            }
        }
    }
}

fn draw_ui(frame: &mut Frame, input: &Input, title: &str, hint: &str) {
    let size = frame.area();

    let popup_width = size.width.saturating_sub(4).min(80);
    let popup_area = centered_rect(popup_width, 3, size);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .title_bottom(Line::from(format!(" {} · Enter to submit, Esc to cancel ", hint)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner_area = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let input_width = inner_area.width as usize;
    let cursor_pos = input.visual_cursor();
    let scroll = input.visual_scroll(input_width);

    let visible_value: String = input
        .value()
        .chars()
        .skip(scroll)
        .take(input_width)
        .collect();
    frame.render_widget(
        Paragraph::new(Line::from(vec![Span::styled(
            visible_value,
            Style::default().fg(Color::White),
        )])),
        inner_area,
    );

    let cursor_x = inner_area.x + cursor_pos.saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x, inner_area.y));
}

/// Center a `width` x `height` rectangle inside `area`, clamped to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
