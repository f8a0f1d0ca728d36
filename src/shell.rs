//! Presentation shell: two views and an interactive command loop

use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::api::{build_client, VideoBackend};
use crate::config::Config;
use crate::display::{progress_bar, share_text};
use crate::download::download_video;
use crate::error::{MAX_DURATION_SECS, MIN_DURATION_SECS};
use crate::generation::{GenerationWorkflow, WorkflowState};
use crate::models::{AspectRatio, GeneratedVideo, Resolution};
use crate::views::{DeleteOutcome, GenerateView, HistoryView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Generate,
    History,
}

impl ActiveView {
    pub const ALL: [ActiveView; 2] = [Self::Generate, Self::History];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Generate => "Generate",
            Self::History => "History",
        }
    }
}

impl fmt::Display for ActiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActiveView {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generate" | "gen" | "g" => Ok(Self::Generate),
            "history" | "h" => Ok(Self::History),
            other => Err(format!("Unknown view: {} (expected generate or history)", other)),
        }
    }
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tab(ActiveView),
    Prompt(String),
    SetAspectRatio(AspectRatio),
    SetResolution(Resolution),
    SetDuration(u32),
    Generate,
    Cancel,
    Wait,
    Status,
    Show,
    List,
    Refresh,
    Select(String),
    /// Close the history preview
    Close,
    Delete(String),
    /// Issued after the user confirmed a deletion
    ConfirmedDelete(String),
    Download(Option<PathBuf>),
    Share,
    Options,
    Help,
    Quit,
}

/// What the loop should do after a command ran
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Confirm { prompt: String, on_yes: Command },
    /// Follow the running generation until it ends
    Follow,
    Quit,
}

const HELP: &str = "\
Commands:
  tab generate|history        switch view
  prompt <text>               set the video description
  set aspect <16:9|9:16|1:1>  set aspect ratio
  set resolution <480p|720p|1080p>
  set duration <5-12>
  options                     list available options
  generate                    start generating (runs in the background)
  wait                        follow progress until the video is ready (Ctrl-C cancels)
  status                      show the generation view
  cancel                      stop the running generation
  list | refresh              show / reload history
  select <id>                 preview a history entry
  close                       close the preview
  delete <id>                 delete a history entry
  download [dir]              save the current video
  share                       print shareable text for the current video
  quit";

/// Parse one input line. Blank lines yield an empty error.
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Err(String::new());
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let require_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("Usage: {} <{}>", word, what))
        } else {
            Ok(rest.to_string())
        }
    };

    match word.to_lowercase().as_str() {
        "tab" | "view" => Ok(Command::Tab(require_arg("generate|history")?.parse()?)),
        "prompt" => Ok(Command::Prompt(rest.to_string())),
        "set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .map(|(k, v)| (k.to_lowercase(), v.trim()))
                .ok_or_else(|| "Usage: set <aspect|resolution|duration> <value>".to_string())?;
            match key.as_str() {
                "aspect" | "ratio" | "aspect-ratio" => value
                    .parse()
                    .map(Command::SetAspectRatio)
                    .map_err(|e: crate::error::ValidationError| e.to_string()),
                "resolution" | "res" => value
                    .parse()
                    .map(Command::SetResolution)
                    .map_err(|e: crate::error::ValidationError| e.to_string()),
                "duration" => value
                    .trim_end_matches('s')
                    .parse()
                    .map(Command::SetDuration)
                    .map_err(|_| format!("Invalid duration: {}", value)),
                other => Err(format!("Unknown setting: {}", other)),
            }
        }
        "generate" | "gen" => Ok(Command::Generate),
        "cancel" => Ok(Command::Cancel),
        "wait" => Ok(Command::Wait),
        "status" => Ok(Command::Status),
        "show" => Ok(Command::Show),
        "list" | "ls" => Ok(Command::List),
        "refresh" => Ok(Command::Refresh),
        "select" => Ok(Command::Select(require_arg("id")?)),
        "close" => Ok(Command::Close),
        "delete" | "rm" => Ok(Command::Delete(require_arg("id")?)),
        "download" => Ok(Command::Download((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        "share" => Ok(Command::Share),
        "options" => Ok(Command::Options),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command: {} (type `help`)", other)),
    }
}

/// Application state: the active view plus both views
///
/// Switching views only changes `active`; each view keeps its own state.
pub struct App {
    backend: Arc<dyn VideoBackend>,
    client: reqwest::Client,
    download_dir: PathBuf,
    active: ActiveView,
    generate: GenerateView,
    history: HistoryView,
}

impl App {
    pub fn new(backend: Arc<dyn VideoBackend>, config: &Config) -> crate::error::Result<Self> {
        let workflow = GenerationWorkflow::new(Arc::clone(&backend), config.polling.clone());
        Ok(Self {
            generate: GenerateView::new(workflow, config.defaults.request()),
            history: HistoryView::new(),
            active: ActiveView::default(),
            client: build_client(&config.backend)?,
            download_dir: config.output.download_dir.clone(),
            backend,
        })
    }

    pub fn active(&self) -> ActiveView {
        self.active
    }

    pub fn switch_to(&mut self, view: ActiveView) {
        self.active = view;
    }

    /// Work a view does when it becomes visible
    pub async fn activate(&mut self) {
        match self.active {
            ActiveView::Generate => self.generate.sync().await,
            ActiveView::History => self.history.ensure_loaded(self.backend.as_ref()).await,
        }
    }

    pub fn generate_view(&self) -> &GenerateView {
        &self.generate
    }

    pub fn generate_view_mut(&mut self) -> &mut GenerateView {
        &mut self.generate
    }

    pub fn history_view(&self) -> &HistoryView {
        &self.history
    }

    /// Client used for downloads
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn render(&self) -> String {
        let tabs: Vec<String> = ActiveView::ALL
            .iter()
            .map(|view| {
                if *view == self.active {
                    format!("[{}]", view.label())
                } else {
                    format!(" {} ", view.label())
                }
            })
            .collect();

        let body = match self.active {
            ActiveView::Generate => self.generate.render(),
            ActiveView::History => self.history.render(),
        };
        format!("{}\n{}", tabs.join(" "), body)
    }

    /// Video that download/share act on for the active view
    fn current_video(&self) -> Option<GeneratedVideo> {
        match self.active {
            ActiveView::Generate => self.generate.result().cloned(),
            ActiveView::History => self.history.selected().cloned(),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Reply {
        match command {
            Command::Tab(view) => {
                self.switch_to(view);
                self.activate().await;
                Reply::Text(self.render())
            }
            Command::Prompt(prompt) => {
                self.generate.set_prompt(prompt);
                Reply::Text(self.generate.prompt_counter())
            }
            Command::SetAspectRatio(aspect_ratio) => {
                self.generate.set_aspect_ratio(aspect_ratio);
                Reply::Text(format!("Aspect ratio: {}", aspect_ratio.label()))
            }
            Command::SetResolution(resolution) => {
                self.generate.set_resolution(resolution);
                Reply::Text(format!("Resolution: {}", resolution.label()))
            }
            Command::SetDuration(duration) => match self.generate.set_duration(duration) {
                Ok(()) => Reply::Text(format!("Duration: {}s", duration)),
                Err(e) => Reply::Text(e.to_string()),
            },
            Command::Generate => {
                self.generate.sync().await;
                match self.generate.generate() {
                    Ok(()) => Reply::Text(
                        "🎬 Generation started. Use `wait` to follow it or `status` to check on it.".to_string(),
                    ),
                    Err(e) => Reply::Text(format!("⚠ {}", e)),
                }
            }
            Command::Cancel => {
                if self.generate.cancel() {
                    Reply::Text("🛑 Cancelling generation".to_string())
                } else {
                    Reply::Text("No generation in progress".to_string())
                }
            }
            Command::Wait => {
                if self.generate.current().is_some() {
                    Reply::Follow
                } else {
                    Reply::Text("No generation in progress".to_string())
                }
            }
            Command::Status => {
                self.generate.sync().await;
                Reply::Text(self.generate.render())
            }
            Command::Show => {
                self.activate().await;
                Reply::Text(self.render())
            }
            Command::List => {
                self.history.ensure_loaded(self.backend.as_ref()).await;
                Reply::Text(self.history.render())
            }
            Command::Refresh => {
                self.history.reload(self.backend.as_ref()).await;
                Reply::Text(self.history.render())
            }
            Command::Select(id) => {
                self.history.ensure_loaded(self.backend.as_ref()).await;
                if self.history.select(&id).is_some() {
                    Reply::Text(self.history.render())
                } else {
                    Reply::Text(format!("No video with id {}", id))
                }
            }
            Command::Close => {
                self.history.clear_selection();
                Reply::Text(self.history.render())
            }
            Command::Delete(id) => {
                self.history.ensure_loaded(self.backend.as_ref()).await;
                if self.history.videos().iter().any(|v| v.id == id) {
                    Reply::Confirm {
                        prompt: "Are you sure you want to delete this video? [y/N]".to_string(),
                        on_yes: Command::ConfirmedDelete(id),
                    }
                } else {
                    Reply::Text(format!("No video with id {}", id))
                }
            }
            Command::ConfirmedDelete(id) => {
                match self.history.delete(self.backend.as_ref(), &id, |_| true).await {
                    Ok(DeleteOutcome::Deleted) => Reply::Text(format!("🗑️ Deleted video {}", id)),
                    Ok(DeleteOutcome::NotFound) => Reply::Text(format!("No video with id {}", id)),
                    Ok(DeleteOutcome::Declined) => Reply::Text("Cancelled".to_string()),
                    Err(e) => Reply::Text(format!("⚠ Failed to delete video: {}", e)),
                }
            }
            Command::Download(dir) => {
                let Some(video) = self.current_video() else {
                    return Reply::Text("Nothing to download: generate a video or select one in history".to_string());
                };
                let dir = dir.unwrap_or_else(|| self.download_dir.clone());
                match download_video(&self.client, &video, &dir).await {
                    Ok(path) => Reply::Text(format!("💾 Saved to {}", path.display())),
                    Err(e) => Reply::Text(format!("⚠ Download failed: {}", e)),
                }
            }
            Command::Share => match self.current_video() {
                Some(video) if video.is_ready() => Reply::Text(share_text(&video)),
                _ => Reply::Text("Nothing to share yet".to_string()),
            },
            Command::Options => Reply::Text(options_text()),
            Command::Help => Reply::Text(HELP.to_string()),
            Command::Quit => Reply::Quit,
        }
    }
}

fn options_text() -> String {
    let aspects: Vec<&str> = AspectRatio::ALL.iter().map(|a| a.label()).collect();
    let resolutions: Vec<&str> = Resolution::ALL.iter().map(|r| r.label()).collect();
    format!(
        "Aspect ratios: {}\nResolutions: {}\nDurations: {}-{} seconds (24 fps)",
        aspects.join(", "),
        resolutions.join(", "),
        MIN_DURATION_SECS,
        MAX_DURATION_SECS
    )
}

/// Show progress of the running generation until it ends
///
/// The first `interrupt` cancels the generation; following continues until
/// the workflow reports its terminal state.
pub async fn follow_generation<F, Fut>(view: &mut GenerateView, mut interrupt: F) -> io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let Some(handle) = view.current() else {
        return Ok(());
    };
    let mut progress = handle.subscribe_progress();
    let mut state = handle.subscribe_state();
    let mut interrupted = false;

    loop {
        if state.borrow_and_update().is_terminal() {
            break;
        }

        let label = match &*state.borrow() {
            WorkflowState::Submitting => "Submitting...".to_string(),
            _ => format!("Generating... {}", progress_bar(*progress.borrow(), 30)),
        };
        print!("\r{}", label);
        std::io::stdout().flush()?;

        tokio::select! {
            changed = state.changed() => if changed.is_err() { break },
            changed = progress.changed() => if changed.is_err() { break },
            _ = interrupt(), if !interrupted => {
                interrupted = true;
                view.cancel();
            }
        }
    }
    println!();

    view.wait().await;
    Ok(())
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C at the prompt
pub async fn run_shell(app: App) -> Result<()> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    run_session(app, lines, tokio::signal::ctrl_c).await
}

/// Command loop over any line source
///
/// `interrupt` resolves when the user asks to stop: while a generation is
/// followed it cancels the generation, at the prompt it ends the session.
pub async fn run_session<R, F, Fut>(mut app: App, mut lines: Lines<R>, mut interrupt: F) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    app.activate().await;
    println!("{}", app.render());
    println!("Type `help` for commands. Ctrl-C or `quit` exits.");

    loop {
        print!("{}> ", app.active().label().to_lowercase());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupt() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) if message.is_empty() => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let mut reply = app.execute(command).await;
        loop {
            match reply {
                Reply::Text(text) => {
                    println!("{}", text);
                    break;
                }
                Reply::Confirm { prompt, on_yes } => {
                    print!("{} ", prompt);
                    std::io::stdout().flush()?;
                    let answer = lines.next_line().await?.unwrap_or_default();
                    if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                        reply = app.execute(on_yes).await;
                    } else {
                        println!("Cancelled");
                        break;
                    }
                }
                Reply::Follow => {
                    follow_generation(app.generate_view_mut(), &mut interrupt).await?;
                    println!("{}", app.generate_view().render());
                    break;
                }
                Reply::Quit => return Ok(()),
            }
        }
    }

    Ok(())
}
