use bankasm::{bank::MemoryBank, AsmApp};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{error::Error, io};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

struct App<'a> {
    banks_state: TableState,
    words_state: TableState,
    banks: Vec<&'a MemoryBank>,
    title: String,
}

impl<'a> App<'a> {
    fn new(asm: &'a AsmApp) -> App<'a> {
        let banks = asm
            .images
            .as_ref()
            .map(|images| images.iter().collect())
            .unwrap_or_default();
        let mut banks_state = TableState::default();
        banks_state.select(Some(0));
        App {
            banks_state,
            words_state: TableState::default(),
            banks,
            title: asm.bench.unwrap_or("images").to_string(),
        }
    }

    fn selected(&self) -> Option<&'a MemoryBank> {
        self.banks_state
            .selected()
            .and_then(|idx| self.banks.get(idx).copied())
    }

    fn select_bank(&mut self, delta: isize) {
        if self.banks.is_empty() {
            return;
        }
        let current = self.banks_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(self.banks.len() as isize);
        self.banks_state.select(Some(next as usize));
        self.words_state.select(None);
    }

    fn scroll_words(&mut self, delta: isize) {
        let depth = self.selected().map(|b| b.depth()).unwrap_or(0);
        if depth == 0 {
            return;
        }
        let current = self.words_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, depth as isize - 1);
        self.words_state.select(Some(next as usize));
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Up => app.select_bank(-1),
                KeyCode::Down => app.select_bank(1),
                KeyCode::Char('k') => app.scroll_words(-1),
                KeyCode::Char('j') => app.scroll_words(1),
                KeyCode::PageUp => app.scroll_words(-32),
                KeyCode::PageDown => app.scroll_words(32),
                _ => {}
            }
        }
    }
}

struct Windows {
    banks: Rect,
    words: Rect,
    footer: Rect,
}

fn calculate_layout<B: Backend>(f: &mut Frame<B>) -> Windows {
    let rows = Layout::default()
        .constraints([Constraint::Min(0), Constraint::Length(6)].as_ref())
        .margin(1)
        .split(f.size());

    let main_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(20)].as_ref())
        .split(rows[0]);

    Windows {
        banks: main_cols[0],
        words: main_cols[1],
        footer: rows[1],
    }
}

fn render_banks<'a>(app: &App<'a>) -> Table<'a> {
    let selected_style = Style::default().add_modifier(Modifier::REVERSED);
    let name_style = Style::default().fg(Color::White);
    let rows = app.banks.iter().map(|bank| {
        let cells = vec![
            Cell::from(bank.name().to_string()).style(name_style),
            Cell::from(bank.depth().to_string()),
            Cell::from(bank.len().to_string()),
        ];
        Row::new(cells).height(1)
    });
    Table::new(rows)
        .header(Row::new(vec!["bank", "depth", "used"]))
        .highlight_style(selected_style)
        .highlight_symbol(">")
        .block(Block::default().borders(Borders::ALL).title(app.title.clone()))
        .widths(&[
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Length(7),
        ])
}

fn render_words<'a>(app: &App<'a>) -> Table<'a> {
    let selected_style = Style::default().add_modifier(Modifier::REVERSED);
    let name_style = Style::default().fg(Color::White);
    let bank = app.selected();
    let title = bank.map(|b| b.name().to_string()).unwrap_or_default();
    let rows = bank.into_iter().flat_map(|b| b.cells()).map(|entry| {
        let cells = vec![
            Cell::from(format!("{:04}", entry.address.0)).style(name_style),
            Cell::from(entry.word.to_string()),
            Cell::from(entry.label.unwrap_or("").to_string()),
        ];
        Row::new(cells).height(1)
    });
    Table::new(rows)
        .highlight_style(selected_style)
        .block(Block::default().borders(Borders::ALL).title(title))
        .widths(&[
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Percentage(100),
        ])
}

fn render_help<'a>() -> Paragraph<'a> {
    const TEXT: &str = r#"
 q          quit
 UP/DOWN    select bank
 j/k PG     scroll words"#;
    Paragraph::new(TEXT).block(Block::default().borders(Borders::ALL).title("Help"))
}

fn ui<B: Backend>(f: &mut Frame<B>, app: &mut App) {
    let layout = calculate_layout(f);

    f.render_stateful_widget(render_banks(app), layout.banks, &mut app.banks_state);
    f.render_stateful_widget(render_words(app), layout.words, &mut app.words_state);
    f.render_widget(render_help(), layout.footer);
}

pub fn start_viewmode(asm: &AsmApp) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(asm);
    let res = run_app(&mut terminal, app);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}
