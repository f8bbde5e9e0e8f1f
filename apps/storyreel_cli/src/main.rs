mod repl;
mod state;
mod view;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use state::EditorState;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyreel_core::limits::EditorLimits;
use storyreel_preview::mpv::MpvSurface;
use storyreel_preview::preview::PreviewController;
use storyreel_render::config::{ServerConfig, DEFAULT_SERVER_URL};
use storyreel_render::progress::RenderProgress;
use storyreel_render::request::{export, Resolution};
use storyreel_render::service::{HttpRenderService, RenderService};
use storyreel_render::upload::{UploadCoordinator, UploadOutcome};
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "storyreel", version, about = "Assemble AI storyboards into rendered videos")]
struct Cli {
    /// Render server base URL
    #[arg(long, env = "STORYREEL_SERVER", default_value = DEFAULT_SERVER_URL, global = true)]
    server: String,

    /// Session file holding the timeline and pending scenes
    #[arg(
        long,
        env = "STORYREEL_SESSION",
        default_value = "storyreel.session.json",
        global = true
    )]
    session: PathBuf,

    /// Lift the duration limits (per clip and in total)
    #[arg(long, global = true)]
    no_duration_limit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import pasted AI output (a file, or - for stdin) as scene suggestions
    Import { input: PathBuf },
    /// List scene suggestions still waiting for an upload
    Scenes,
    /// Upload media files and add them to the timeline
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the timeline
    Show,
    /// Edit the timeline interactively
    Edit {
        /// Where uploaded files can be found for previews
        #[arg(long, default_value = "uploads")]
        media_dir: PathBuf,
    },
    /// Render the timeline and download the result
    Export {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Output path (defaults to the server's file name)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Show render progress from the server
        #[arg(long)]
        progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let limits = if cli.no_duration_limit {
        EditorLimits::lenient()
    } else {
        EditorLimits::strict()
    };
    let mut state = EditorState::load(&cli.session, limits.clone())?;
    let config = ServerConfig::new(cli.server);

    match cli.command {
        Commands::Import { input } => {
            let text = read_input(&input)?;
            let count = state
                .session
                .import_visual_timeline(&text)
                .context("could not import the visual timeline")?;
            state.save()?;
            println!("imported {count} scene suggestions");
        }
        Commands::Scenes => {
            let scenes: Vec<_> = state.session.pending_scenes.iter().collect();
            print!("{}", view::scene_list(&scenes));
        }
        Commands::Upload { files } => {
            let service = HttpRenderService::new(&config)?;
            let report = UploadCoordinator::new(&service, limits)
                .upload_batch(&files, &mut state.session.pending_scenes, &mut state.timeline)
                .await;
            state.save()?;

            for outcome in &report.outcomes {
                match outcome {
                    UploadOutcome::Added { path, index } => {
                        println!("added {} as clip {index}", path.display())
                    }
                    UploadOutcome::Failed { path, error } => {
                        eprintln!("failed {}: {error}", path.display())
                    }
                }
            }
            if report.added() == 0 {
                bail!("no files were uploaded");
            }
        }
        Commands::Show => print!("{}", view::timeline_table(state.timeline.clips())),
        Commands::Edit { media_dir } => {
            let mut preview = PreviewController::new(MpvSurface::new(), media_dir);
            let stdin = std::io::stdin();
            repl::run(&mut state, &mut preview, stdin.lock(), std::io::stdout())?;
        }
        Commands::Export {
            width,
            height,
            output,
            progress,
        } => {
            let resolution = Resolution::from_parts(width, height)?;
            let service = Arc::new(HttpRenderService::new(&config)?);

            let watcher = progress.then(|| spawn_progress_printer(Arc::clone(&service)));
            let result = export(service.as_ref(), &state.timeline, resolution).await;
            if let Some(handle) = watcher {
                handle.abort();
            }
            let rendered = result.context("export failed")?;

            // Only the file name of the server's reference is used locally.
            let path = match output {
                Some(path) => path,
                None => Path::new(&rendered.name)
                    .file_name()
                    .map(PathBuf::from)
                    .context("server returned an unusable output name")?,
            };
            tokio::fs::write(&path, &rendered.bytes)
                .await
                .with_context(|| format!("could not write {}", path.display()))?;
            info!(path = %path.display(), bytes = rendered.bytes.len(), "export saved");
            println!("saved {}", path.display());
        }
    }
    Ok(())
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("could not read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("could not read {}", input.display()))
    }
}

/// Print progress updates until the stream ends. Errors end the watcher only.
fn spawn_progress_printer(service: Arc<HttpRenderService>) -> tokio::task::JoinHandle<()> {
    let (tx, mut rx) = watch::channel(RenderProgress::default());
    tokio::spawn(async move {
        let printer = async {
            while rx.changed().await.is_ok() {
                let percent = rx.borrow_and_update().percent;
                eprintln!("rendering... {percent:.0}%");
            }
        };
        let (watched, ()) = tokio::join!(service.watch_progress(tx), printer);
        if let Err(e) = watched {
            debug!(error = %e, "progress stream ended");
        }
    })
}
