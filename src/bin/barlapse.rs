use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use barlapse::{AnimationConfig, FrameIndex};

#[derive(Parser, Debug)]
#[command(name = "barlapse", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single animation frame as a PNG.
    Frame(FrameArgs),
    /// Render the full animation to MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame index (0-based, hold frames included).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path (defaults to the configured path).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Animation config JSON; missing fields fall back to the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input spreadsheet or CSV (overrides the configured path).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Sheet name (overrides the configured sheet).
    #[arg(long)]
    sheet: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_config(args: &CommonArgs) -> anyhow::Result<AnimationConfig> {
    let mut cfg = match &args.config {
        Some(path) => read_config_json(path)?,
        None => AnimationConfig::default(),
    };

    if let Some(data) = &args.data {
        cfg.data.path = data.clone();
    }
    if let Some(sheet) = &args.sheet {
        cfg.data.sheet = sheet.clone();
    }

    cfg.validate()?;
    Ok(cfg)
}

fn read_config_json(path: &Path) -> anyhow::Result<AnimationConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let r = BufReader::new(f);
    let cfg: AnimationConfig = serde_json::from_reader(r).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = read_config(&args.common)?;
    let dataset = barlapse::load_dataset(&cfg.data)?;

    let frame = barlapse::render_frame(&dataset, &cfg, FrameIndex(args.frame))?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = read_config(&args.common)?;
    let dataset = barlapse::load_dataset(&cfg.data)?;

    println!("Data read from {}:", cfg.data.path.display());
    print!("{dataset}");

    let out_path = args.out.clone().unwrap_or_else(|| cfg.out_path.clone());
    let out = barlapse::render_to_mp4(&dataset, &cfg, out_path)?;

    println!("{}", out.display());
    Ok(())
}
