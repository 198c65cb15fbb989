//! Toolbench CLI - offline PDF, image and text utilities.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolbench_core::util::bytes_to_readable;
use toolbench_core::{
    AppConfig, AssetStore, CompressionMode, DEFAULT_IMAGE_QUALITY, Error, ImageFormat, InputFile,
    JobKind, JwtAlgorithm, ResultAsset, SegmentField, ToolState, Toolkit, convert_image,
    converted_file_name, decode_base64, encode_base64, inspect_token, sign_token,
};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeOption {
    /// Lossless re-save with structural cleanups
    Optimize,
    /// Replace every page with a JPEG render
    Rasterize,
}

impl From<ModeOption> for CompressionMode {
    fn from(opt: ModeOption) -> Self {
        match opt {
            ModeOption::Optimize => Self::Optimize,
            ModeOption::Rasterize => Self::Rasterize,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "toolbench")]
#[command(author, version, about = "Offline PDF, image and text utilities", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge PDFs, in the order given, into one
    Join {
        /// Input PDF files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file name (default: merged.pdf)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to write into (default: next to the first input)
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },

    /// Split a PDF into page ranges, one file per range
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Page range such as "1-3" or "5"; repeat for more files
        #[arg(short, long = "segment", value_name = "RANGE")]
        segments: Vec<String>,

        /// Directory to write into (default: next to the input)
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },

    /// Shrink a PDF
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Compression mode
        #[arg(short, long, value_enum, default_value = "optimize")]
        mode: ModeOption,

        /// Render resolution for rasterize mode (100-300)
        #[arg(long)]
        dpi: Option<u32>,

        /// JPEG quality for rasterize mode (0.40-0.95)
        #[arg(long)]
        quality: Option<f32>,

        /// Output file name (default: <input>-compressed.pdf)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to write into (default: next to the input)
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },

    /// Convert images between formats
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Encode or decode Base64 text
    Base64 {
        /// Decode instead of encode
        #[arg(short, long)]
        decode: bool,

        /// Text to convert
        text: String,
    },

    /// Inspect or sign JSON Web Tokens
    Jwt {
        #[command(subcommand)]
        action: JwtAction,
    },
}

#[derive(Subcommand, Debug)]
enum ImageAction {
    /// Re-encode an image as PNG, JPEG, WebP or GIF
    Convert {
        /// Input image file
        input: PathBuf,

        /// Target format
        #[arg(short, long, default_value = "png")]
        to: ImageFormat,

        /// Quality for JPEG and WebP (0.10-1.00)
        #[arg(short, long, default_value_t = DEFAULT_IMAGE_QUALITY)]
        quality: f32,

        /// Output file name (default: <input>.<ext>)
        #[arg(short, long)]
        output: Option<String>,

        /// Directory to write into (default: next to the input)
        #[arg(short = 'd', long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum JwtAction {
    /// Decode a token and verify its signature if a secret is given
    Decode {
        token: String,

        /// Algorithm to assume when the header names none we support
        #[arg(long, default_value = "HS256")]
        alg: JwtAlgorithm,

        /// Shared secret
        #[arg(long, env = "TOOLBENCH_JWT_SECRET", default_value = "")]
        secret: String,
    },

    /// Build a token from header and payload JSON
    Sign {
        /// Payload JSON
        payload: String,

        /// Header JSON
        #[arg(long, default_value = "{}")]
        header: String,

        #[arg(long, default_value = "HS256")]
        alg: JwtAlgorithm,

        /// Shared secret (required for HS256)
        #[arg(long, env = "TOOLBENCH_JWT_SECRET", default_value = "")]
        secret: String,
    },
}

/// Split "a-b" or "a" into raw start and end strings.
fn parse_range(range: &str) -> (&str, &str) {
    range
        .split_once('-')
        .map_or((range, range), |(start, end)| (start, end))
}

/// Pick the output directory: flag, then config, then the input's folder.
fn output_dir(flag: Option<PathBuf>, config: &AppConfig, input: &Path) -> PathBuf {
    flag.or_else(|| config.output.directory.clone())
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_input(path: &Path) -> Result<InputFile> {
    InputFile::from_path(path).context(format!("Failed to read {}", path.display()))
}

/// Fail with the tool's notice unless the job succeeded.
fn ensure_success(state: ToolState, notice: Option<&str>) -> Result<()> {
    if state == ToolState::Success {
        Ok(())
    } else {
        bail!("{}", notice.unwrap_or("The job did not complete"))
    }
}

fn save(store: &AssetStore, asset: &ResultAsset, dir: &Path) -> Result<PathBuf> {
    let destination = dir.join(asset.name());
    store
        .save_as(asset, &destination)
        .context(format!("Failed to write output: {}", destination.display()))?;
    Ok(destination)
}

#[allow(clippy::print_stderr)]
fn print_notice(notice: Option<&str>) {
    if let Some(notice) = notice {
        eprintln!("{notice}");
    }
}

async fn run_join(
    toolkit: &Arc<Toolkit>,
    inputs: &[PathBuf],
    output: Option<String>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let mut tool = toolkit.join_tool()?;
    let files = inputs.iter().map(|p| read_input(p)).collect::<Result<Vec<_>>>()?;
    tool.add_files(files);
    print_notice(tool.notice());
    if let Some(name) = output {
        tool.set_output_name(name);
    }

    info!("Merging {} files", tool.files().len());
    let state = tool.merge().await;
    ensure_success(state, tool.notice())?;

    let dir = output_dir(out_dir, toolkit.config(), &inputs[0]);
    if let Some(asset) = tool.result() {
        let path = save(tool.store(), asset, &dir)?;
        #[allow(clippy::print_stdout)]
        {
            println!("Merged PDF saved to: {}", path.display());
        }
    }
    Ok(())
}

async fn run_split(
    toolkit: &Arc<Toolkit>,
    input: &Path,
    segments: &[String],
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let mut tool = toolkit.split_tool()?;
    if !tool.load(read_input(input)?) {
        bail!("{}", tool.notice().unwrap_or("Could not load the document"));
    }

    for (index, range) in segments.iter().enumerate() {
        let id = if index == 0 {
            tool.segments()[0].id
        } else {
            tool.add_segment().context("No document loaded")?
        };
        let (start, end) = parse_range(range);
        tool.update_segment(id, SegmentField::Start, start);
        tool.update_segment(id, SegmentField::End, end);
    }

    let state = tool.split().await;
    ensure_success(state, tool.notice())?;

    let dir = output_dir(out_dir, toolkit.config(), input);
    for asset in tool.results() {
        let path = save(tool.store(), asset, &dir)?;
        #[allow(clippy::print_stdout)]
        {
            println!("Saved: {}", path.display());
        }
    }
    Ok(())
}

async fn run_compress(
    toolkit: &Arc<Toolkit>,
    input: &Path,
    mode: ModeOption,
    dpi: Option<u32>,
    quality: Option<f32>,
    output: Option<String>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let mut tool = toolkit.compress_tool()?;
    if !tool.load(read_input(input)?) {
        bail!("{}", tool.notice().unwrap_or("Could not load the document"));
    }
    tool.set_mode(mode.into());
    if let Some(dpi) = dpi {
        tool.set_dpi(dpi);
    }
    if let Some(quality) = quality {
        tool.set_quality(quality);
    }
    if let Some(name) = output {
        tool.set_output_name(name);
    }

    let pb = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    let report = |done: usize, total: usize| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    };

    let state = match tool.mode() {
        CompressionMode::Optimize => tool.compress(None).await,
        CompressionMode::Rasterize => {
            let raster = tool.raster();
            info!("Rasterizing at {} DPI, quality {:.2}", raster.dpi, raster.quality);
            tool.compress(Some(&report)).await
        }
    };
    pb.finish_and_clear();
    ensure_success(state, tool.notice())?;

    let dir = output_dir(out_dir, toolkit.config(), input);
    if let Some(asset) = tool.result() {
        let path = save(tool.store(), asset, &dir)?;
        #[allow(clippy::print_stdout)]
        {
            println!("{} PDF saved to: {}", tool.mode(), path.display());
            if let Some(delta) = tool.size_delta() {
                println!("{delta}");
            }
        }
    }
    Ok(())
}

fn run_image(config: &AppConfig, action: ImageAction) -> Result<()> {
    let ImageAction::Convert {
        input,
        to,
        quality,
        output,
        out_dir,
    } = action;

    let file = read_input(&input)?;
    let declared_image = file
        .media_type
        .as_deref()
        .is_some_and(|m| m.starts_with("image/"));
    if !declared_image && ImageFormat::detect(&file.bytes).is_none() {
        let err = Error::UnsupportedFiles {
            names: vec![file.name],
        };
        bail!("{}", err.user_message(JobKind::Convert));
    }

    if to.is_lossy() {
        info!("Converting {} to {} at quality {:.2}", file.name, to, quality);
    } else {
        info!("Converting {} to {}", file.name, to);
    }
    let bytes = convert_image(&file.bytes, to, quality).map_err(|e| {
        warn!("Image conversion failed: {}", e);
        anyhow!(e.user_message(JobKind::Convert))
    })?;

    let name = output.unwrap_or_else(|| converted_file_name(&file.name, to));
    let destination = output_dir(out_dir, config, &input).join(name);
    std::fs::write(&destination, &bytes)
        .context(format!("Failed to write output: {}", destination.display()))?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "{} image saved to: {} ({})",
            to,
            destination.display(),
            bytes_to_readable(bytes.len() as u64)
        );
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn run_jwt(action: JwtAction) -> Result<()> {
    match action {
        JwtAction::Decode { token, alg, secret } => {
            let inspection = inspect_token(&token, alg, &secret)?;
            println!("Header:\n{}", serde_json::to_string_pretty(&inspection.token.header)?);
            println!("Payload:\n{}", serde_json::to_string_pretty(&inspection.token.payload)?);
            match (&inspection.token.signature, inspection.token.signature_len()) {
                (Some(signature), Some(len)) => println!("Signature ({len} bytes):\n{signature}"),
                (Some(signature), None) => println!("Signature:\n{signature}"),
                (None, _) => println!("No signature present"),
            }
            println!("{} ({})", inspection.signature, inspection.algorithm);
        }
        JwtAction::Sign {
            payload,
            header,
            alg,
            secret,
        } => {
            println!("{}", sign_token(&header, &payload, alg, &secret)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    let toolkit = Toolkit::new(config);

    let result = match args.command {
        Command::Join {
            inputs,
            output,
            out_dir,
        } => run_join(&toolkit, &inputs, output, out_dir).await,
        Command::Split {
            input,
            segments,
            out_dir,
        } => run_split(&toolkit, &input, &segments, out_dir).await,
        Command::Compress {
            input,
            mode,
            dpi,
            quality,
            output,
            out_dir,
        } => run_compress(&toolkit, &input, mode, dpi, quality, output, out_dir).await,
        Command::Image { action } => run_image(toolkit.config(), action),
        Command::Base64 { decode, text } => {
            let converted = if decode {
                decode_base64(&text).context("Failed to decode")?
            } else {
                encode_base64(&text)
            };
            #[allow(clippy::print_stdout)]
            {
                println!("{converted}");
            }
            Ok(())
        }
        Command::Jwt { action } => run_jwt(action),
    };

    toolkit.shutdown();
    result
}
