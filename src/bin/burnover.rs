use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use burnover::{
    AccentColor, Dimensions, EncoderInventory, ExportOpts, ExportOutcome, ExportSession,
    FontLibrary, Fps, OverlayConfig, RecorderOpts, RefreshTicker, SessionOpts, SkipReason,
    SourceVideo, Surface, decode_frame_at, draw_frame, negotiate,
};

#[derive(Parser, Debug)]
#[command(name = "burnover", version)]
struct Cli {
    /// Print per-stage diagnostics to stderr.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a video with the overlay burned in (requires `ffmpeg` and `ffprobe` on PATH).
    Export(ExportArgs),
    /// Composite the overlay onto one frame and write it as a PNG.
    Frame(FrameArgs),
    /// Probe a video and print its metadata plus the encoding profile this host negotiates.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct OverlayArgs {
    /// Overlay JSON (caption/headline/body/accent); flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Caption chip text; empty hides the chip.
    #[arg(long)]
    caption: Option<String>,

    /// Headline, drawn upper-cased in the accent color.
    #[arg(long)]
    headline: Option<String>,

    /// Supporting copy, word-wrapped below the headline.
    #[arg(long)]
    body: Option<String>,

    /// Accent color as `#rgb` or `#rrggbb` hex.
    #[arg(long)]
    accent: Option<AccentColor>,

    /// Font file to rasterize with; system sans-serif when omitted.
    #[arg(long)]
    font: Option<PathBuf>,
}

impl OverlayArgs {
    fn resolve(&self) -> anyhow::Result<OverlayConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("read overlay config '{}'", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parse overlay config '{}'", path.display()))?
            }
            None => OverlayConfig::default(),
        };
        if let Some(v) = &self.caption {
            cfg.caption = v.clone();
        }
        if let Some(v) = &self.headline {
            cfg.headline = v.clone();
        }
        if let Some(v) = &self.body {
            cfg.body = v.clone();
        }
        if let Some(v) = self.accent {
            cfg.accent = v;
        }
        Ok(cfg)
    }
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path; a directory gets the suggested `<stem>-overlay.<ext>` name.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    overlay: OverlayArgs,

    /// Capture rate in frames per second; defaults to the source rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Pace ticks against the wall clock instead of free-running.
    #[arg(long)]
    realtime: bool,

    /// Target video bitrate in bits per second.
    #[arg(long, default_value_t = 6_000_000)]
    bitrate: u32,

    /// Render at WIDTHxHEIGHT instead of the source size.
    #[arg(long, value_parser = parse_size)]
    size: Option<Dimensions>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Media time to sample, in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Composite at WIDTHxHEIGHT instead of the source size.
    #[arg(long, value_parser = parse_size)]
    size: Option<Dimensions>,

    #[command(flatten)]
    overlay: OverlayArgs,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_size(s: &str) -> Result<Dimensions, String> {
    let Some((w, h)) = s.split_once(['x', 'X']) else {
        return Err(format!("'{s}' is not WIDTHxHEIGHT"));
    };
    let width = w.parse().map_err(|_| format!("bad width in '{s}'"))?;
    let height = h.parse().map_err(|_| format!("bad height in '{s}'"))?;
    let dims = Dimensions::new(width, height);
    if dims.is_empty() {
        return Err(format!("'{s}' has a zero side"));
    }
    Ok(dims)
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let session = ExportSession::new(SessionOpts {
        font_path: args.overlay.font.clone(),
    })?;
    session.overlay().set(args.overlay.resolve()?);

    let source = SourceVideo::load(&args.in_path)?;
    let meta = source.await_ready()?;
    session.set_source(source);

    let fps = match args.fps {
        Some(rate) => Fps::whole(rate)?,
        None => Fps::whole(meta.fps.rounded_clamped(120))?,
    };
    let mut ticker = if args.realtime {
        RefreshTicker::paced(fps)
    } else {
        RefreshTicker::new(fps)
    };

    let opts = ExportOpts {
        recorder: RecorderOpts {
            video_bitrate: args.bitrate,
            ..RecorderOpts::default()
        },
        surface_dims: args.size,
    };

    match session.export(&mut ticker, &opts)? {
        ExportOutcome::Completed(handle) => {
            let saved = handle.save_to(&args.out)?;
            eprintln!("wrote {}", saved.display());
            Ok(())
        }
        ExportOutcome::Skipped(SkipReason::NoSource) => anyhow::bail!("no source loaded"),
        ExportOutcome::Skipped(SkipReason::AlreadyActive) => {
            anyhow::bail!("an export is already running")
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let source = SourceVideo::load(&args.in_path)?;
    let meta = source.await_ready()?;

    let fonts = FontLibrary::load(args.overlay.font.as_deref())?;
    let config = args.overlay.resolve()?;

    let frame = decode_frame_at(source.path(), &meta, args.at)?;
    let dims = args.size.unwrap_or_else(|| meta.dimensions());
    let mut surface = Surface::new(dims)?;
    draw_frame(&mut surface, &frame, &config, &fonts);

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
    }
    image::save_buffer_with_format(
        &args.out,
        surface.data(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let source = SourceVideo::load(&args.in_path)?;
    let meta = source.await_ready()?;
    println!("{}", serde_json::to_string_pretty(&meta)?);

    let profile = negotiate(&EncoderInventory::detect());
    println!("profile: {} ({})", profile.name, profile.mime);
    Ok(())
}
