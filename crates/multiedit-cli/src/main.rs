mod app;

use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use multiedit_config::Config;
use multiedit_engine::{Document, io};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::collections::BTreeSet;
use std::io::{Stdout, stdout};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::{env, fs, process};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <file>", args[0]);
        process::exit(1);
    }
    let path = PathBuf::from(&args[1]);

    let (config, first_run) = match Config::load() {
        Ok(Some(config)) => (config, false),
        Ok(None) => (Config::default(), true),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", Config::config_path().display());
            process::exit(1);
        }
    };

    // The terminal belongs to the UI, so logs go to a file
    if let Err(e) = init_logging(&config.log_path()) {
        eprintln!("Warning: logging disabled: {e}");
    }
    log::info!("multiedit starting up on {}", path.display());
    if first_run {
        write_default_config(&config, &Config::config_path());
    }

    let doc = if path.exists() {
        match io::open_document(&path) {
            Ok(doc) => doc,
            Err(e) => {
                eprintln!("Error: Cannot open '{}': {e}", path.display());
                process::exit(1);
            }
        }
    } else {
        Document::new("").with_modes(io::modes_for_path(&path))
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(path, doc, config.into_settings());

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn init_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// Persist the defaults so there is a file to edit
fn write_default_config(config: &Config, config_path: &Path) {
    match config.save_to_path(config_path) {
        Ok(()) => log::info!(
            "Created default config file at {}",
            config_path.display()
        ),
        Err(e) => log::warn!("Failed to create default config file: {e}"),
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

/// How a single character cell is drawn
struct CellStyles {
    caret: Style,
    cursor: Style,
    selection: Style,
    workspace: Style,
}

impl CellStyles {
    fn new(match_cursor_visual_style: bool) -> Self {
        let caret = Style::default().add_modifier(Modifier::REVERSED);
        let cursor = if match_cursor_visual_style {
            caret
        } else {
            Style::default().bg(Color::Magenta).fg(Color::Black)
        };
        Self {
            caret,
            cursor,
            selection: Style::default().bg(Color::Blue),
            workspace: Style::default().bg(Color::DarkGray),
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let text = app.doc.contents();
    let caret = app.doc.caret();
    let cursors: BTreeSet<usize> = app.session.cursors().offsets().into_iter().collect();
    let selection = app.doc.selection();
    let workspace = app.session.workspace().map(|w| w.range());
    let styles = CellStyles::new(app.session.settings().match_cursor_visual_style);

    // Keep the caret line on screen
    let height = chunks[0].height.saturating_sub(2) as usize;
    let caret_line = text[..caret].matches('\n').count();
    if caret_line < app.scroll {
        app.scroll = caret_line;
    } else if height > 0 && caret_line >= app.scroll + height {
        app.scroll = caret_line + 1 - height;
    }

    let mut lines = Vec::new();
    let mut offset = 0;
    for line_text in text.split('\n') {
        let mut spans = Vec::new();
        for (i, c) in line_text.char_indices() {
            let at = offset + i;
            let style = cell_style(at, caret, &cursors, &selection, &workspace, &styles);
            spans.push(Span::styled(c.to_string(), style));
        }
        // A caret or cursor at the end of a line gets a blank cell
        let end = offset + line_text.len();
        if end == caret || cursors.contains(&end) {
            let style = cell_style(end, caret, &cursors, &selection, &workspace, &styles);
            spans.push(Span::styled(" ", style));
        }
        lines.push(Line::from(spans));
        offset = end + 1;
    }

    let title = format!(
        "{}{}",
        app.path.display(),
        if app.dirty { " *" } else { "" }
    );
    let content = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((app.scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(content, chunks[0]);

    f.render_widget(Paragraph::new(status_line(app)), chunks[1]);

    let bottom = match &app.prompt {
        Some(input) => Line::from(vec![
            Span::raw("Mark all matching regex: "),
            Span::raw(input.clone()),
        ]),
        None => Line::from(vec![
            Span::raw("M-a: All | M-n/M-p: Next/Prev | M-l: Lines | M-m: Add | "),
            Span::raw("M-r: Record | M-e: Replay | Esc: Quit session | "),
            Span::raw("M-o: Workspace | C-s: Save | C-q: Exit"),
        ]),
    };
    f.render_widget(Paragraph::new(bottom), chunks[2]);
}

fn cell_style(
    at: usize,
    caret: usize,
    cursors: &BTreeSet<usize>,
    selection: &Option<Range<usize>>,
    workspace: &Option<Range<usize>>,
    styles: &CellStyles,
) -> Style {
    if at == caret {
        styles.caret
    } else if cursors.contains(&at) {
        styles.cursor
    } else if selection.as_ref().is_some_and(|range| range.contains(&at)) {
        styles.selection
    } else if workspace.as_ref().is_some_and(|range| range.contains(&at)) {
        styles.workspace
    } else {
        Style::default()
    }
}

fn status_line(app: &App) -> Line<'static> {
    let mut parts = vec![
        Span::styled(
            format!(" {} ", app.session.state()),
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        Span::raw(format!(" {} cursors", app.session.cursors().len())),
    ];
    if let Some(workspace) = app.session.workspace() {
        parts.push(Span::raw(format!(" | in {}", workspace.describe())));
    }
    if !app.session.recorded().is_empty() {
        parts.push(Span::raw(format!(
            " | {} ops recorded",
            app.session.recorded().len()
        )));
    }
    if !app.message.is_empty() {
        parts.push(Span::raw(format!(" | {}", app.message)));
    }
    Line::from(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_write_default_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("multiedit").join("config.toml");

        write_default_config(&Config::default(), &config_path);

        let loaded = Config::load_from_path(&config_path).unwrap();
        assert_eq!(loaded, Some(Config::default()));
    }
}
