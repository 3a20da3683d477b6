use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use textreel::{FrameRenderer, Pipeline, PipelineOpts, RenderRequest, Resolution};

#[derive(Parser, Debug)]
#[command(name = "textreel", version)]
struct Cli {
    /// Pipeline options JSON (every key optional).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a title video with the audio asset muxed in (requires `ffmpeg` and `ffprobe`).
    Render(RenderArgs),
    /// Render a single title frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Text drawn on every frame.
    #[arg(long)]
    text: String,

    /// Video length in seconds.
    #[arg(long, default_value_t = 3.0)]
    duration: f64,

    /// Output resolution.
    #[arg(long, value_enum, default_value_t = Resolution::Hd)]
    resolution: Resolution,

    /// Frames per second (defaults to the configured frame rate).
    #[arg(long)]
    fps: Option<u32>,

    /// Audio asset to mux (defaults to the configured asset).
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Copy the final MP4 here.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Text drawn on the frame.
    #[arg(long)]
    text: String,

    /// Output resolution.
    #[arg(long, value_enum, default_value_t = Resolution::Hd)]
    resolution: Resolution,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = load_opts(cli.config.as_deref())?;
    match cli.cmd {
        Command::Render(args) => cmd_render(opts, args),
        Command::Frame(args) => cmd_frame(opts, args),
    }
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<PipelineOpts> {
    match path {
        Some(p) => PipelineOpts::from_json_file(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(PipelineOpts::default()),
    }
}

fn cmd_render(mut opts: PipelineOpts, args: RenderArgs) -> anyhow::Result<()> {
    if let Some(audio) = args.audio {
        opts.audio_asset = audio;
    }
    let fps = args.fps.unwrap_or(opts.frame_rate);
    let request = RenderRequest::with_frame_rate(args.text, args.duration, args.resolution, fps)?;

    let pipeline = Pipeline::new(opts)?;
    let out = pipeline.render_blocking(request)?;

    let out = match args.out {
        Some(dst) => {
            if let Some(parent) = dst.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::copy(&out, &dst)
                .with_context(|| format!("copy '{}' to '{}'", out.display(), dst.display()))?;
            dst
        }
        None => out,
    };

    println!("{}", out.display());
    Ok(())
}

fn cmd_frame(opts: PipelineOpts, args: FrameArgs) -> anyhow::Result<()> {
    let mut renderer = FrameRenderer::new(opts.renderer)?;
    let frame = renderer.render(&args.text, args.resolution.canvas())?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let straight = unpremultiply(frame.data());
    image::save_buffer_with_format(
        &args.out,
        &straight,
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = premul.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
