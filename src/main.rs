//! Keystroke Tally - counts key presses system-wide
//!
//! Runs a terminal dashboard by default. `--headless` counts until Ctrl-C
//! and prints the totals.

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Terminal,
};
use std::{io::stdout, sync::mpsc, time::Duration};

use keystroke_tally::{
    config::{Config, ConfigError},
    keyboard::model,
    logging::{self, LogTarget},
    report,
    tally::{RecorderState, StopReason},
    ui::{App, AppState, AppView, CountsPanel, HelpPanel, KeyChart, StatusBar, TabBar},
    Recorder,
};

fn main() -> Result<()> {
    let headless = match std::env::args().nth(1).as_deref() {
        None => false,
        Some("--headless") => true,
        Some("-h") | Some("--help") => {
            println!("usage: keystroke-tally [--headless]");
            return Ok(());
        }
        Some(other) => bail!("unknown argument: {}", other),
    };

    let (config, config_err) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let target = if headless {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    logging::init(&config.logging, target)?;
    if let Some(e) = config_err {
        report_config_error(&e);
    }

    if headless {
        run_headless(&config)
    } else {
        run_tui(config)
    }
}

fn report_config_error(e: &ConfigError) {
    log::warn!("using default configuration: {}", e);
}

fn run_headless(config: &Config) -> Result<()> {
    let (quit_tx, quit_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = quit_tx.send(());
    })
    .context("installing Ctrl-C handler")?;

    let mut recorder = Recorder::from_config(config);
    recorder.start()?;
    eprintln!(
        "Counting key presses via {} (Ctrl-C to stop)",
        recorder.source_name()
    );

    loop {
        match quit_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if recorder.state() == RecorderState::Stopped(StopReason::SourceEnded) {
                    eprintln!("Key source went away; stopping.");
                    break;
                }
            }
        }
    }

    recorder.stop();
    let status = recorder.status();
    if status.failed_saves > 0 {
        eprintln!("{} save(s) failed during this session", status.failed_saves);
    }
    print!("{}", report::stats_text(&recorder.snapshot()));
    Ok(())
}

fn run_tui(config: Config) -> Result<()> {
    let tick_rate = config.refresh_interval();
    let recorder = Recorder::from_config(&config);
    let changes = recorder.subscribe_changes();

    let mut app = App::new(config, recorder, model::detect());
    app.start_recording();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &changes, tick_rate);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if app.state != AppState::Quitting {
        app.quit();
    }
    result?;

    println!("\nKeystroke Tally session complete.");
    println!("Total presses recorded: {}", app.snapshot.total());
    println!("Distinct keys: {}", app.snapshot.len());

    Ok(())
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    changes: &mpsc::Receiver<()>,
    tick_rate: Duration,
) -> Result<()> {
    loop {
        // Coalesce every notification since the last frame into one refresh
        let mut changed = false;
        while changes.try_recv().is_ok() {
            changed = true;
        }
        if changed {
            app.refresh();
        } else {
            app.sync_status();
        }

        terminal.draw(|frame| {
            let size = frame.area();
            frame.render_widget(
                Block::default().style(Style::default().bg(app.colors.bg)),
                size,
            );

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Tab bar
                    Constraint::Min(5),    // Main content
                    Constraint::Length(1), // Status bar
                ])
                .split(size);

            let tab_names: Vec<&str> = AppView::all().iter().map(|v| v.name()).collect();
            let tab_bar = TabBar::new(&tab_names, app.view.index(), app.colors);
            frame.render_widget(tab_bar, chunks[0]);

            match app.view {
                AppView::Counts => {
                    let panel = CountsPanel::new(&app.snapshot, app.scroll, app.colors);
                    frame.render_widget(panel, chunks[1]);
                }
                AppView::Chart => {
                    let chart = KeyChart::new(&app.snapshot, app.config.ui.chart_limit, app.colors);
                    frame.render_widget(chart, chunks[1]);
                }
                AppView::Help => {
                    frame.render_widget(HelpPanel::new(app.colors), chunks[1]);
                }
            }

            let status = StatusBar::new(
                app.state_label(),
                app.view.name(),
                &app.keyboard,
                app.snapshot.total(),
                app.colors,
            )
            .message(app.get_status());
            frame.render_widget(status, chunks[2]);
        })?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    CtKeyCode::Char('q') | CtKeyCode::Esc => app.quit(),
                    CtKeyCode::BackTab => app.prev_view(),
                    CtKeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
                        app.prev_view();
                    }
                    CtKeyCode::Tab => app.next_view(),
                    CtKeyCode::Up => app.scroll_up(),
                    CtKeyCode::Down => app.scroll_down(),
                    CtKeyCode::Char('?') => app.view = AppView::Help,
                    CtKeyCode::Char('e') => app.export_text(),
                    CtKeyCode::Char('j') => app.export_json(),
                    _ => {}
                }
            }
        }

        if app.state == AppState::Quitting {
            return Ok(());
        }
    }
}
