use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slidecast::{
    CancelToken, CommandSynthesizer, ConversionRequest, Converter, PipelineConfig, PptxParser,
    Upload,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a deck into a narrated MP4 (requires `ffmpeg`, `ffprobe` and a TTS program).
    Convert(ConvertArgs),
    /// Render one slide as a PNG.
    Frame(FrameArgs),
    /// Print the narration text of every slide as JSON.
    Narration(NarrationArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input PPTX.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process slides in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// TTS program; must accept `-v <lang> -w <out> --stdin` like `espeak-ng`.
    #[arg(long, default_value = "espeak-ng")]
    voice_cmd: String,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input PPTX.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Slide index (0-based).
    #[arg(long)]
    slide: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct NarrationArgs {
    /// Input PPTX.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slidecast=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Narration(args) => cmd_narration(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::from_path(p)?,
        None => PipelineConfig::default(),
    })
}

fn read_deck(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read deck '{}'", path.display()))
}

fn cmd_convert(args: ConvertArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    cfg.parallel |= args.parallel;
    if args.threads.is_some() {
        cfg.threads = args.threads;
    }

    let synth = CommandSynthesizer::new(
        args.voice_cmd,
        ["-v", "{lang}", "-w", "{out}", "--stdin"],
        "wav",
    );
    let converter = Converter::new(cfg, Arc::new(PptxParser::new()), Arc::new(synth))?;

    let filename = args
        .in_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let req = ConversionRequest {
        document: Some(Upload {
            filename,
            bytes: read_deck(&args.in_path)?,
        }),
        output_path: args.out,
    };
    let out = converter.convert_to_mp4(req, &CancelToken::new())?;

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let converter = Converter::with_defaults(load_config(args.config.as_deref())?)?;
    let frame = converter.render_slide_frame(&read_deck(&args.in_path)?, args.slide)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_narration(args: NarrationArgs) -> anyhow::Result<()> {
    let converter = Converter::with_defaults(load_config(args.config.as_deref())?)?;
    let narrations = converter.narrations(&read_deck(&args.in_path)?)?;
    println!("{}", serde_json::to_string_pretty(&narrations)?);
    Ok(())
}
