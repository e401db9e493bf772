use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cutline::export::ExportBackend as _;

#[derive(Parser, Debug)]
#[command(name = "cutline", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe a media file and print its stream info as JSON.
    Probe(ProbeArgs),
    /// Render a single timeline frame as a PNG.
    Frame(FrameArgs),
    /// Render a timeline to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Media file to probe.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,

    /// Disable audio mixing for this render.
    #[arg(long, default_value_t = false)]
    no_audio: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = cutline::media::probe_media(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn load_timeline(path: &PathBuf) -> anyhow::Result<cutline::Timeline> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read timeline '{}'", path.display()))?;
    Ok(cutline::Timeline::from_json(&json)?)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let timeline = load_timeline(&args.in_path)?;
    let fps = timeline.settings.fps;

    let mut farm = cutline::media::DecodeFarm::new();
    for asset in &timeline.assets {
        if asset.kind == cutline::model::MediaKind::Video {
            farm.open(asset, fps)?;
        }
    }

    let resolver = cutline::FrameResolver::new(&timeline);
    let resolved = resolver.resolve_frame(cutline::FrameIndex(args.frame));
    let mut compositor = cutline::Compositor::new(timeline.settings.canvas);
    let data = compositor.render_frame(&timeline, &resolved, &mut farm)?;
    farm.close_all();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &data,
        timeline.settings.canvas.width,
        timeline.settings.canvas.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let timeline = load_timeline(&args.in_path)?;

    if !cutline::encode::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg not found on PATH");
    }

    let mut opts = cutline::FfmpegSinkOpts::new(&args.out);
    opts.overwrite = args.overwrite;
    let sink = cutline::FfmpegSink::new(opts);

    let mut exporter = cutline::OfflineExporter::new(sink);
    let request = cutline::ExportRequest {
        range: None,
        keep_audio: !args.no_audio,
    };
    let cancel = cutline::CancelToken::new();
    let mut last_pct = 0u64;
    exporter.export(&timeline, &request, &cancel, &mut |p| {
        let pct = p.frames_done * 100 / p.frames_total.max(1);
        if pct >= last_pct + 10 || p.frames_done == p.frames_total {
            eprintln!("rendered {}/{} frames", p.frames_done, p.frames_total);
            last_pct = pct;
        }
    })?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
