mod render;

use agentic_ui_config::{Config, LazySettings};
use agentic_ui_engine::{
    Conversation, LazyConfig, LazyList, Placement, Render, Role, StreamingParser, io,
    perf::{ContentType, generate_operation_id},
    performance_monitor,
};
use agentic_ui_sandbox::{create_configured_sandbox, health_checker, safe_math_eval};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
    time::Duration,
};

/// Terminal rows mapped onto the pixel units the lazy list works in.
const ROW_PX: f64 = 20.0;
/// Bytes revealed per tick in typewriter mode.
const TYPEWRITER_CHUNK: usize = 6;
const TICK: Duration = Duration::from_millis(30);

struct Typewriter {
    parser: StreamingParser,
    source: String,
    revealed: usize,
    op_id: String,
}

struct App {
    conversation: Conversation,
    /// Rendered lines per bubble, filled when a bubble is first shown.
    rendered: Vec<Option<Vec<Line<'static>>>>,
    list: LazyList,
    scroll: usize,
    /// Stick to the bottom as content grows.
    follow: bool,
    typewriter: Option<Typewriter>,
}

impl App {
    fn new(conversation: Conversation, lazy: LazyConfig, typewriter: bool) -> Self {
        let mut list = LazyList::new(lazy);
        list.set_items(conversation.roles());

        let typewriter = if typewriter {
            conversation.bubbles().last().map(|bubble| {
                let op_id = generate_operation_id();
                let monitor = performance_monitor();
                monitor.start_monitoring(&op_id, ContentType::Text, bubble.content.len());
                Typewriter {
                    parser: StreamingParser::new().with_monitor(monitor, op_id.clone()),
                    source: bubble.content.clone(),
                    revealed: 0,
                    op_id,
                }
            })
        } else {
            None
        };

        Self {
            rendered: vec![None; conversation.len()],
            conversation,
            list,
            scroll: 0,
            follow: true,
            typewriter,
        }
    }

    fn is_streaming(&self) -> bool {
        self.typewriter
            .as_ref()
            .is_some_and(|t| t.revealed < t.source.len())
    }

    /// Reveals the next chunk of the streamed bubble.
    fn tick(&mut self) {
        let Some(typewriter) = self.typewriter.as_mut() else {
            return;
        };
        if typewriter.revealed >= typewriter.source.len() {
            return;
        }
        let mut next = (typewriter.revealed + TYPEWRITER_CHUNK).min(typewriter.source.len());
        while !typewriter.source.is_char_boundary(next) {
            next += 1;
        }
        typewriter
            .parser
            .push_str(&typewriter.source[typewriter.revealed..next]);
        typewriter.revealed = next;

        if typewriter.revealed == typewriter.source.len()
            && let Some(summary) = performance_monitor().end_monitoring(&typewriter.op_id)
        {
            log::info!(
                "streamed {} bytes in {:?} ({})",
                typewriter.source.len(),
                summary.duration,
                summary.rating.as_str()
            );
        }

        if let Some(last) = self.conversation.len().checked_sub(1) {
            self.rendered[last] = None;
            if self.list.entries().get(last).is_some_and(|e| e.is_mounted()) {
                let rows = self.bubble_lines(last).len();
                self.list.measure(last, rows as f64 * ROW_PX);
            }
        }
    }

    fn bubble_lines(&mut self, index: usize) -> Vec<Line<'static>> {
        if let Some(Some(lines)) = self.rendered.get(index) {
            return lines.clone();
        }
        let Some(bubble) = self.conversation.bubbles().get(index) else {
            return Vec::new();
        };
        let streamed = self
            .typewriter
            .as_ref()
            .filter(|_| index + 1 == self.conversation.len());
        let body = match streamed {
            Some(typewriter) => render::schema_lines(typewriter.parser.schema()),
            None => render::schema_lines(&bubble.schema()),
        };

        let (label, color) = match bubble.role {
            Role::User => ("you", Color::Green),
            Role::Assistant => ("assistant", Color::Cyan),
            Role::System => ("system", Color::Gray),
        };
        let mut lines = vec![Line::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )];
        lines.extend(body);
        lines.push(Line::default());
        if bubble.role.placement() == Placement::Right {
            lines = lines.into_iter().map(Line::right_aligned).collect();
        }

        if let Some(slot) = self.rendered.get_mut(index) {
            *slot = Some(lines.clone());
        }
        lines
    }

    fn max_scroll(&self, height: usize) -> usize {
        let total = (self.list.total_height() / ROW_PX).ceil() as usize;
        total.saturating_sub(height)
    }

    fn scroll_by(&mut self, delta: isize, height: usize) {
        self.scroll = self
            .scroll
            .saturating_add_signed(delta)
            .min(self.max_scroll(height));
        self.follow = self.scroll == self.max_scroll(height);
    }

    fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow = false;
    }

    fn scroll_to_bottom(&mut self, height: usize) {
        self.follow = true;
        self.scroll = self.max_scroll(height);
    }

    /// Updates the viewport and measures anything that just got mounted.
    fn layout(&mut self, height: usize) {
        if self.follow {
            self.scroll = self.max_scroll(height);
        }
        self.list
            .set_viewport(self.scroll as f64 * ROW_PX, height as f64 * ROW_PX);

        let unmeasured: Vec<usize> = self
            .list
            .entries()
            .iter()
            .filter(|e| e.is_mounted() && e.measured_height.is_none())
            .map(|e| e.index)
            .collect();
        for index in unmeasured {
            let rows = self.bubble_lines(index).len();
            let shift = self.list.measure(index, rows as f64 * ROW_PX);
            if shift != 0.0 && !self.follow {
                let scroll = self.scroll as f64 + shift / ROW_PX;
                self.scroll = scroll.max(0.0).round() as usize;
            }
        }
        if self.follow {
            self.scroll = self.max_scroll(height);
        }
    }

    fn visible_lines(&mut self, height: usize) -> Vec<Line<'static>> {
        let range = self.list.visible_range();
        let first_row = self
            .list
            .offset_of(range.start)
            .map_or(0, |offset| (offset / ROW_PX).round() as usize);

        let mut lines = Vec::new();
        for index in range {
            match self.list.decision(index) {
                Some(Render::Content) => lines.extend(self.bubble_lines(index)),
                Some(Render::Placeholder(info)) => {
                    let label = self.list.placeholder_text(&info).unwrap_or_else(|| {
                        format!("· {} message {}/{} ·", info.role, info.index + 1, info.total)
                    });
                    let rows = ((info.height / ROW_PX).round() as usize).max(1);
                    lines.push(Line::styled(
                        label,
                        Style::default().add_modifier(Modifier::DIM),
                    ));
                    lines.extend((1..rows).map(|_| Line::default()));
                }
                None => {}
            }
        }

        lines
            .into_iter()
            .skip(self.scroll.saturating_sub(first_row))
            .take(height)
            .collect()
    }

    fn status(&self) -> String {
        let mounted = self
            .list
            .entries()
            .iter()
            .filter(|e| e.is_mounted())
            .count();
        let mut status = format!(
            "{} messages · {} rendered · {} placeholders",
            self.list.len(),
            mounted,
            self.list.len() - mounted
        );
        if let Some(typewriter) = &self.typewriter {
            status.push_str(&format!(
                " · streamed {}/{} bytes",
                typewriter.revealed,
                typewriter.source.len()
            ));
        }
        status
    }
}

fn lazy_config(settings: &LazySettings) -> Result<LazyConfig> {
    let config = LazyConfig {
        enable: settings.enable,
        ..LazyConfig::default()
    }
    .with_placeholder_height(settings.placeholder_height)
    .with_root_margin(&settings.root_margin)?
    .keep_last(settings.keep_last);
    Ok(config)
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} [transcripts-folder-path] [--typewriter]");
    eprintln!("       {program} eval <expression>");
    eprintln!("       {program} run <script-file>");
    eprintln!("       {program} health");
    process::exit(1);
}

fn eval_command(args: &[String]) -> Result<()> {
    let expression = args.join(" ");
    match safe_math_eval(&expression) {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.kind, e.message);
            process::exit(1);
        }
    }
}

/// Runs a script file under the configured sandbox preset.
fn run_command(script: &str) -> Result<()> {
    let code = std::fs::read_to_string(script)?;
    let preset = Config::load()?.unwrap_or_default().sandbox.preset;
    let result = create_configured_sandbox(&preset).execute(&code, None);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.success {
        process::exit(1);
    }
    Ok(())
}

fn health_command() -> Result<()> {
    let checker = health_checker();
    let report = serde_json::json!({
        "environment": checker.check_environment_support(),
        "self_test": checker.test_basic_functionality(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("agentic-ui-cli", String::as_str);

    match args.get(1).map(String::as_str) {
        Some("eval") if args.len() > 2 => return eval_command(&args[2..]),
        Some("eval") => usage(program),
        Some("run") => match args.get(2) {
            Some(script) => return run_command(script),
            None => usage(program),
        },
        Some("health") => return health_command(),
        _ => {}
    }

    let mut cli_path = None;
    let mut typewriter = false;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--typewriter" => typewriter = true,
            flag if flag.starts_with("--") => usage(program),
            path if cli_path.is_none() => cli_path = Some(PathBuf::from(path)),
            _ => usage(program),
        }
    }

    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            usage(program);
        }
    };

    // CLI argument wins over the config file
    let (transcripts_path, from_config) = match (cli_path, config.as_ref()) {
        (Some(path), _) => (path, false),
        (None, Some(Config {
            transcripts_path: Some(path),
            ..
        })) => (path.clone(), true),
        (None, _) => {
            eprintln!("Error: No transcripts path provided and none configured");
            eprintln!("Or set transcripts_path in {}", config_path.display());
            usage(program);
        }
    };

    if let Err(e) = io::validate_transcripts_dir(&transcripts_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Transcripts path '{}'{} is invalid: {e}",
            transcripts_path.display(),
            source
        );
        process::exit(1);
    }

    let config = config.unwrap_or_default();
    performance_monitor().set_enabled(config.monitor.enabled);
    let conversation = io::load_conversation(&transcripts_path)?;
    let mut app = App::new(conversation, lazy_config(&config.lazy)?, typewriter);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if config.monitor.enabled {
        log::info!("{:?}", performance_monitor().get_report());
    }

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut page = 1;
    loop {
        terminal.draw(|f| page = ui(f, app))?;

        let timeout = if app.is_streaming() {
            TICK
        } else {
            Duration::from_secs(1)
        };
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let page_delta = isize::try_from(page).unwrap_or(isize::MAX);
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1, page),
                KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1, page),
                KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_by(page_delta, page),
                KeyCode::PageUp => app.scroll_by(-page_delta, page),
                KeyCode::Home | KeyCode::Char('g') => app.scroll_to_top(),
                KeyCode::End | KeyCode::Char('G') => app.scroll_to_bottom(page),
                _ => {}
            }
        }
        app.tick();
    }
}

/// Draws one frame and returns the height of the message pane in rows.
fn ui(f: &mut Frame, app: &mut App) -> usize {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let height = usize::from(chunks[0].height.saturating_sub(2));
    app.layout(height);
    let lines = app.visible_lines(height);

    let messages = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Conversation"),
    );
    f.render_widget(messages, chunks[0]);

    let status = Paragraph::new(Line::styled(
        app.status(),
        Style::default().add_modifier(Modifier::DIM),
    ));
    f.render_widget(status, chunks[1]);

    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k ↓/j: Scroll | "),
        Span::raw("PgUp/PgDn: Page | "),
        Span::raw("g/G: Top/Bottom"),
    ]);
    f.render_widget(Paragraph::new(help_text), chunks[2]);

    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_ui_engine::Bubble;
    use pretty_assertions::assert_eq;

    fn conversation(n: usize) -> Conversation {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                Bubble::new(role, format!("# Message {i}\n\nbody {i}"))
            })
            .collect()
    }

    fn lazy(keep_last: usize) -> LazyConfig {
        lazy_config(&LazySettings {
            keep_last,
            ..LazySettings::default()
        })
        .unwrap()
    }

    #[test]
    fn lazy_settings_become_config() {
        let settings = LazySettings {
            enable: true,
            placeholder_height: 40.0,
            root_margin: "10px 0px".to_string(),
            keep_last: 2,
        };
        let config = lazy_config(&settings).unwrap();
        assert!(config.enable);
        assert_eq!(config.placeholder_height, 40.0);
        assert!(!config.defers(9, 10));
        assert!(config.defers(0, 10));
    }

    #[test]
    fn bad_margin_is_an_error() {
        let settings = LazySettings {
            root_margin: "wide".to_string(),
            ..LazySettings::default()
        };
        assert!(lazy_config(&settings).is_err());
    }

    #[test]
    fn bottom_of_long_conversation_renders_and_top_is_placeholder() {
        let mut app = App::new(conversation(50), lazy(3), false);
        app.layout(20);
        app.layout(20);

        assert!(!app.list.is_placeholder(49));
        assert!(app.list.is_placeholder(0));
        assert_eq!(app.visible_lines(20).len(), 20);
    }

    #[test]
    fn scrolling_to_top_promotes_first_messages() {
        let mut app = App::new(conversation(50), lazy(3), false);
        app.layout(20);
        app.scroll_to_top();
        app.layout(20);

        assert!(!app.list.is_placeholder(0));
        let first = &app.visible_lines(20)[0];
        assert_eq!(first.spans[0].content, "you");
    }

    #[test]
    fn typewriter_streams_last_bubble_to_completion() {
        let mut app = App::new(conversation(2), lazy(1), true);
        while app.is_streaming() {
            app.tick();
        }
        let typewriter = app.typewriter.as_ref().unwrap();
        assert_eq!(typewriter.parser.source(), "# Message 1\n\nbody 1");
        assert_eq!(
            typewriter.parser.schema(),
            agentic_ui_engine::parse("# Message 1\n\nbody 1").schema.as_slice()
        );
    }

    #[test]
    fn status_counts_rendered_items() {
        let mut app = App::new(conversation(4), LazyConfig::default(), false);
        app.layout(10);
        assert_eq!(app.status(), "4 messages · 4 rendered · 0 placeholders");
    }
}
