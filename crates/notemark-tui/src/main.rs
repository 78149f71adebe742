//! Terminal demo for notemark.
//!
//! ```bash
//! cargo run -p notemark-tui -- note.md [config.json]
//! ```
//!
//! Logs go to `notemark.log` in the system temp directory so the terminal stays clean. The
//! filter comes from `NOTEMARK_LOG` (for example `NOTEMARK_LOG=notemark_session=debug`).
//!
//! # Keys
//!
//! - Typing, Enter, Backspace, arrows: edit (Shift+arrows select)
//! - Ctrl+B / Ctrl+I / Ctrl+E / Ctrl+K: bold, italic, code, link
//! - Esc: save and close (an empty note closes without saving)
//! - F2: toggle vim mode (`:wq` saves and closes, `:q!` discards)
//! - Ctrl+T: edit the table under the cursor (F3 shows its menu)
//! - Ctrl+L: accept the first `[[` link completion
//! - Ctrl+C / Ctrl+V: copy / paste
//! - Ctrl+Q: quit without saving

mod app;
mod keys;
mod view;

use std::{
    env,
    fs::File,
    io::{self, stdout},
    path::PathBuf,
    process,
    sync::Mutex,
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use notemark_session::SessionConfig;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_subscriber::EnvFilter;

use crate::app::App;

fn init_logging() {
    let filter = EnvFilter::try_from_env("NOTEMARK_LOG")
        .or_else(|_| EnvFilter::try_new("warn,notemark_session=info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let path = env::temp_dir().join("notemark.log");
    match File::create(&path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .compact()
            .init(),
        Err(err) => eprintln!("logging disabled: cannot create {}: {err}", path.display()),
    }
}

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} <note.md> [config.json]", args[0]);
        process::exit(1);
    }
    init_logging();

    let config = match args.get(2) {
        Some(path) => match SessionConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("cannot load {path}: {err}");
                process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };
    let mut app = App::new(PathBuf::from(&args[1]), config)?;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let text = app.finish();
    tracing::info!(chars = text.chars().count(), "exited");
    if let Err(err) = result {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;
        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => app.handle_key_event(key),
                Event::Paste(text) => app.handle_paste(text),
                _ => {}
            }
        }
    }
    Ok(())
}
