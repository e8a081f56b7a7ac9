use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lyrivid", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame of a saved project as a PNG.
    Frame(FrameArgs),
    /// Export a saved project to an MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Snapshot directory (as written by the editor's save).
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Global timeline time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Snapshot directory (as written by the editor's save).
    #[arg(long = "in")]
    in_dir: PathBuf,

    /// Output MP4 path; defaults to `lyrivid-export.mp4` next to the
    /// snapshot.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (project, assets) = lyrivid::load_snapshot(&args.in_dir)?;
    let frame = lyrivid::compose_frame(&project, &assets, args.time);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let (project, assets) = lyrivid::load_snapshot(&args.in_dir)?;

    let opts = match args.out {
        Some(out_path) => lyrivid::ExportOptions {
            out_path,
            overwrite: true,
        },
        None => lyrivid::ExportOptions::in_dir(&args.in_dir),
    };

    let mut session = lyrivid::AudioSession::new();
    if let Some(track) = &project.main_audio {
        session.set_main_gain(track.volume * project.settings.main_volume);
    }
    if let Some(track) = &project.background_audio {
        session.set_background_gain(track.volume);
    }
    let mut driver = lyrivid::PlaybackDriver::new();

    let report = lyrivid::export_project(&project, &assets, &mut session, &mut driver, &opts)?;
    eprintln!(
        "wrote {} ({} frames, {:.2}s, {} bytes)",
        report.out_path.display(),
        report.frames_encoded,
        report.duration_sec,
        report.output_bytes
    );
    Ok(())
}
