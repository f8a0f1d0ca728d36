use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use videogen_client::display::{describe, format_date, history_line};
use videogen_client::download::download_video;
use videogen_client::shell::{follow_generation, run_shell};
use videogen_client::{create_backend, App, AspectRatio, Config, Resolution};

fn cli() -> Command {
    Command::new("videogen")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Generate videos from text prompts and manage your generation history")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to videogen.toml)")
                .global(true),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("Base URL of the generation backend")
                .global(true),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Use the in-process mock backend instead of the network")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate a video and wait for it to finish")
                .arg(
                    Arg::new("prompt")
                        .short('p')
                        .long("prompt")
                        .value_name("TEXT")
                        .help("Description of the video")
                        .required(true),
                )
                .arg(
                    Arg::new("aspect-ratio")
                        .short('a')
                        .long("aspect-ratio")
                        .value_name("RATIO")
                        .help("16:9, 9:16 or 1:1"),
                )
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .value_name("RES")
                        .help("480p, 720p or 1080p"),
                )
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECONDS")
                        .help("Length in seconds (5-12)"),
                )
                .arg(
                    Arg::new("music")
                        .long("music")
                        .help("Request background music")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("download")
                        .long("download")
                        .value_name("DIR")
                        .help("Save the finished video into DIR"),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Check the status of a generation job")
                .arg(Arg::new("job-id").value_name("JOB_ID").required(true)),
        )
        .subcommand(Command::new("history").about("List previously generated videos"))
        .subcommand(
            Command::new("delete")
                .about("Delete a video from history")
                .arg(Arg::new("id").value_name("ID").required(true))
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Skip the confirmation prompt")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("shell").about("Interactive generate/history views (default)"))
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let explicit = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(explicit.as_deref())?;

    if let Some(url) = matches.get_one::<String>("api-url") {
        config.backend.base_url = url.clone();
    }
    if matches.get_flag("mock") {
        config.backend.mock_mode = true;
    }
    if matches.get_flag("verbose") {
        config.output.log_level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` wins over the configured level
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("videogen_client={},videogen={},warn", level, level)))
}

/// Install the subscriber early; the level is adjusted once the config is read
fn init_logging(level: &str) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(log_filter(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let startup_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    let log_handle = init_logging(startup_level);

    let config = load_config(&matches)?;
    if let Err(e) = log_handle.reload(log_filter(&config.output.log_level)) {
        warn!("Could not apply log level {}: {}", config.output.log_level, e);
    }

    debug!("{}", config.summary());
    let backend = create_backend(&config.backend)?;
    info!("🚀 Video generation client using {} backend", backend.name());

    match matches.subcommand() {
        Some(("generate", sub)) => run_generate(App::new(backend, &config)?, sub).await,
        Some(("status", sub)) => {
            let job_id = sub
                .get_one::<String>("job-id")
                .ok_or_else(|| anyhow!("JOB_ID is required"))?;
            let video = backend.check_status(job_id).await?;
            println!("Job {}: {:?}", job_id, video.status);
            if let Some(progress) = video.progress {
                println!("Progress: {:.0}%", progress);
            }
            if video.is_ready() {
                println!("{}\n{}", describe(&video), video.video_url);
            }
            Ok(())
        }
        Some(("history", _)) => {
            let videos = backend.history().await?;
            if videos.is_empty() {
                println!("No videos generated yet");
            }
            for video in &videos {
                println!("{}", history_line(video, false));
            }
            Ok(())
        }
        Some(("delete", sub)) => {
            let id = sub
                .get_one::<String>("id")
                .ok_or_else(|| anyhow!("ID is required"))?;
            if !sub.get_flag("yes") && !confirm("Are you sure you want to delete this video? [y/N]")? {
                println!("Cancelled");
                return Ok(());
            }
            backend.delete_video(id).await?;
            println!("🗑️ Deleted video {}", id);
            Ok(())
        }
        _ => run_shell(App::new(backend, &config)?).await,
    }
}

async fn run_generate(mut app: App, matches: &ArgMatches) -> Result<()> {
    let view = app.generate_view_mut();

    if let Some(prompt) = matches.get_one::<String>("prompt") {
        view.set_prompt(prompt.clone());
    }
    if let Some(aspect_ratio) = matches.get_one::<String>("aspect-ratio") {
        view.set_aspect_ratio(aspect_ratio.parse::<AspectRatio>()?);
    }
    if let Some(resolution) = matches.get_one::<String>("resolution") {
        view.set_resolution(resolution.parse::<Resolution>()?);
    }
    if let Some(duration) = matches.get_one::<String>("duration") {
        let duration: u32 = duration
            .trim_end_matches('s')
            .parse()
            .map_err(|_| anyhow!("Invalid duration: {}", duration))?;
        view.set_duration(duration)?;
    }
    if matches.get_flag("music") {
        view.set_background_music(true);
    }

    view.generate()?;
    follow_generation(view, tokio::signal::ctrl_c).await?;

    let Some(video) = view.result().cloned() else {
        let message = view.error().unwrap_or("Video generation did not finish").to_string();
        return Err(anyhow!(message));
    };

    println!("✅ Generated Video");
    println!("  {}", video.prompt);
    println!("  {}", describe(&video));
    println!("  Created {}", format_date(&video.created_at));
    println!("  {}", video.video_url);

    if let Some(dir) = matches.get_one::<String>("download") {
        let path = download_video(app.client(), &video, Path::new(dir)).await?;
        println!("💾 Saved to {}", path.display());
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
