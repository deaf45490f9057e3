mod input;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use directories::ProjectDirs;
use textmark_core::{
    Command, EventKind, MarkedText, Notice, NoticeLevel, ScaleValue, Session, ViewerConfig,
    ViewerEvent,
};
use textmark_render::PdfiumParser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::input::{parse_line, UiEvent, HELP};

const EMPTY_MARKS: &str = "No text marked yet. Select text in the PDF to mark it.";

#[derive(Debug, Parser)]
#[command(
    name = "textmark",
    version,
    about = "PDF viewer with a selectable text overlay and marked-text clipboard"
)]
struct Args {
    /// PDF file to open
    file: PathBuf,

    /// Page to start on (1-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// Initial zoom: a factor, a percentage, page-width, page-fit or auto
    #[arg(short = 'z', long = "zoom")]
    zoom: Option<ScaleValue>,

    /// Start with the text layer debug visualization on
    #[arg(long)]
    debug: bool,

    /// Start with enhanced selection hit regions
    #[arg(long = "enhanced-selection")]
    enhanced_selection: bool,

    /// Configuration file (defaults to config.toml in the config dir)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Also log to the console
    #[arg(short = 'v', long)]
    verbose: bool,
}

enum LoopAction {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "textmark", "textmark")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs, args.verbose)?;

    let config = load_config(&args, &project_dirs)?;
    let mut session = Session::new(&config);
    session
        .viewer()
        .event_bus()
        .on(EventKind::PageRendered, |event| {
            if let ViewerEvent::PageRendered {
                page_number,
                error: Some(error),
            } = event
            {
                warn!(page = page_number, %error, "page rendered with error");
            }
        });
    session
        .viewer()
        .event_bus()
        .on(EventKind::TextLayerRendered, |event| {
            debug!(?event, "text layer ready");
        });

    let mut stdout = io::stdout();
    let bytes = fs::read(&args.file).with_context(|| format!("failed to read {:?}", args.file))?;
    let parser = PdfiumParser::new()?;
    if let Err(err) = session.open_with(&parser, bytes).await {
        print_notice(&mut stdout, &Notice::error("Failed to load PDF file"))?;
        return Err(err.context(format!("failed to open {:?}", args.file)));
    }
    info!(file = %args.file.display(), pages = session.viewer().pages_count(), "opened");

    if let Some(page) = args.page {
        if let Some(notice) = session.apply(Command::GotoPage { page }).await? {
            print_notice(&mut stdout, &notice)?;
        }
    }

    let file_name = display_name(&args.file);
    print_status(&mut stdout, &format_status(&session, &file_name))?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read command")?;
        match handle_event(parse_line(&line), &mut session, &file_name, &mut stdout).await? {
            LoopAction::Continue => {}
            LoopAction::Quit => break,
        }
    }

    Ok(())
}

async fn handle_event(
    event: UiEvent,
    session: &mut Session,
    file_name: &str,
    out: &mut impl Write,
) -> Result<LoopAction> {
    match event {
        UiEvent::Command(command) => {
            let changes_view = !matches!(
                command,
                Command::ClearMarks | Command::Select { .. } | Command::SubmitSelection(_)
            );
            match session.apply(command).await {
                Ok(Some(notice)) => print_notice(out, &notice)?,
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "command failed");
                    print_notice(out, &Notice::error(format!("{err:#}")))?;
                }
            }
            if changes_view {
                print_status(out, &format_status(session, file_name))?;
            }
        }
        UiEvent::ListSpans => {
            let nodes = session.current_overlay();
            if nodes.is_empty() {
                writeln!(out, "(no text on this page)")?;
            }
            for (index, node) in nodes.iter().enumerate() {
                writeln!(out, "{index:>4}  {:?}", node.text)?;
            }
        }
        UiEvent::ListMarks => {
            let entries = session.marks().entries();
            if entries.is_empty() {
                writeln!(out, "{EMPTY_MARKS}")?;
            }
            for entry in entries {
                writeln!(out, "{}", format_mark_line(entry))?;
            }
        }
        UiEvent::Copy { label } => {
            let notice = match session.find_mark(&label) {
                Some(entry) => copy_to_clipboard(&entry.content),
                None => Notice::warning(format!("No marked text with id {label:?}")),
            };
            print_notice(out, &notice)?;
        }
        UiEvent::Dump => {
            let json = serde_json::to_string_pretty(session.current_overlay())
                .context("failed to serialize overlay")?;
            writeln!(out, "{json}")?;
        }
        UiEvent::Status => print_status(out, &format_status(session, file_name))?,
        UiEvent::Help => writeln!(out, "{HELP}")?,
        UiEvent::Invalid(message) => print_notice(out, &Notice::warning(message))?,
        UiEvent::None => {}
        UiEvent::Quit => return Ok(LoopAction::Quit),
    }
    Ok(LoopAction::Continue)
}

fn load_config(args: &Args, project_dirs: &ProjectDirs) -> Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::load_or_default(&project_dirs.config_dir().join("config.toml"))?,
    };
    if let Some(zoom) = args.zoom {
        config.default_zoom = zoom;
    }
    config.text_layer.debug |= args.debug;
    config.text_layer.enhanced_selection |= args.enhanced_selection;
    config.validate()?;
    Ok(config)
}

fn copy_to_clipboard(content: &str) -> Notice {
    let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(content));
    match result {
        Ok(()) => Notice::success("Text copied to clipboard!"),
        Err(err) => {
            warn!(%err, "clipboard write failed");
            Notice::error("Failed to copy text")
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

fn format_status(session: &Session, file_name: &str) -> String {
    let viewer = session.viewer();
    let options = viewer.text_layer_options();
    let mut status = format!(
        "{} | page {}/{} | {} | {} marked",
        file_name,
        viewer.current_page_number(),
        viewer.pages_count(),
        session.zoom_preset(),
        session.marks().len(),
    );
    if viewer.pages_rotation() != 0 {
        status.push_str(&format!(" | {}°", viewer.pages_rotation()));
    }
    if options.debug {
        status.push_str(" | debug");
    }
    if options.enhanced_selection {
        status.push_str(" | enhanced");
    }
    status
}

fn format_mark_line(entry: &MarkedText) -> String {
    let id = entry.id.to_string();
    format!(
        "{}  p{}  {}  {}",
        &id[..8],
        entry.page_number,
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        truncate_with_ellipsis(entry.content.replace('\n', " "), 60)
    )
}

fn truncate_with_ellipsis(mut text: String, width: usize) -> String {
    if text.chars().count() <= width {
        return text;
    }
    if width == 0 {
        return String::new();
    }
    let cut = text
        .char_indices()
        .nth(width - 1)
        .map_or(text.len(), |(index, _)| index);
    text.truncate(cut);
    text.push('…');
    text
}

fn print_status(writer: &mut impl Write, content: &str) -> Result<()> {
    crossterm::execute!(
        writer,
        SetAttribute(Attribute::Reverse),
        Print(content),
        SetAttribute(Attribute::Reset),
        Print("\n")
    )?;
    Ok(())
}

fn print_notice(writer: &mut impl Write, notice: &Notice) -> Result<()> {
    let color = match notice.level {
        NoticeLevel::Info => Color::Cyan,
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    crossterm::execute!(
        writer,
        SetForegroundColor(color),
        Print(&notice.message),
        ResetColor,
        Print("\n")
    )?;
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs, verbose: bool) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "textmark.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = verbose.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use textmark_core::MarkedTextStore;

    #[test]
    fn status_reports_page_zoom_and_modes() {
        let session = Session::new(&ViewerConfig::default());
        assert_eq!(
            format_status(&session, "paper.pdf"),
            "paper.pdf | page 1/0 | 100% | 0 marked"
        );
    }

    #[test]
    fn mark_lines_are_short_and_single_line() {
        let mut store = MarkedTextStore::new();
        let entry = store.add("first line\nsecond line", 4).clone();
        let line = format_mark_line(&entry);

        assert!(line.starts_with(&entry.id.to_string()[..8]));
        assert!(line.contains("p4"));
        assert!(line.ends_with("first line second line"));
    }

    #[test]
    fn truncation_keeps_char_boundaries() {
        assert_eq!(truncate_with_ellipsis("short".to_string(), 10), "short");
        assert_eq!(truncate_with_ellipsis("ééééé".to_string(), 3), "éé…");
        assert_eq!(truncate_with_ellipsis("abc".to_string(), 0), "");
    }

    #[test]
    fn notices_print_their_message() {
        let mut out = Vec::new();
        print_notice(&mut out, &Notice::success("Text copied to clipboard!")).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Text copied to clipboard!"));
    }

    #[tokio::test]
    async fn listing_marks_without_entries_shows_the_empty_state() {
        let mut session = Session::new(&ViewerConfig::default());
        let mut out = Vec::new();
        handle_event(UiEvent::ListMarks, &mut session, "doc.pdf", &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), EMPTY_MARKS);
    }

    #[tokio::test]
    async fn unknown_mark_id_is_reported() {
        let mut session = Session::new(&ViewerConfig::default());
        let mut out = Vec::new();
        handle_event(
            UiEvent::Copy {
                label: "deadbeef".to_string(),
            },
            &mut session,
            "doc.pdf",
            &mut out,
        )
        .await
        .unwrap();
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("No marked text with id"));
    }
}
