//! zstor: encrypted, deduplicated chunk store CLI
//!
//! Commands:
//!   push <file>            - chunk, encode, and store a file; prints chunk refs
//!   pull <refs> <dest>     - fetch, verify, and reassemble a file from chunk refs
//!   inspect <frame>        - show a stored frame's preamble (and decode it given a key)
//!   config show            - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use zstor_core::config::{LoggingConfig, RemoteKind};
use zstor_core::{ChunkRef, ZstorConfig};
use zstor_crypto::{ChunkCodec, CodecOptions, Frame};
use zstor_storage::{build_remote, DirectoryStore, Remote};
use zstor_sync::engine::{self, ProgressFn};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "zstor",
    version,
    about = "Convergent encrypted chunk store",
    long_about = "zstor: split files into chunks, compress and encrypt each chunk under a key \
                  derived from its content, and store the frames by content identifier"
)]
struct Cli {
    /// Path to zstor.toml configuration file
    #[arg(long, short = 'c', env = "ZSTOR_CONFIG", default_value = "zstor.toml")]
    config: PathBuf,

    /// Enable debug diagnostics (per-chunk hashes)
    #[arg(long, global = true)]
    debug: bool,

    /// Object store directory (overrides [remote] in the config)
    #[arg(long, short = 's', env = "ZSTOR_STORE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk, encode, and store a file
    ///
    /// Writes one JSON chunk ref per line. Without a store this is a dry run:
    /// frames are produced and measured but nothing is persisted.
    Push {
        /// Local file to push
        local: PathBuf,
        /// Chunk size in bytes (overrides chunking.chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Write chunk refs here instead of stdout
        #[arg(long, short = 'o')]
        refs: Option<PathBuf>,
    },

    /// Rebuild a file from chunk refs produced by `push`
    Pull {
        /// JSON-lines chunk refs file ("-" for stdin)
        refs: PathBuf,
        /// Local destination path
        dest: PathBuf,
    },

    /// Show a stored frame's preamble and, given its key, decode it
    Inspect {
        /// Frame file (as written by a directory store)
        frame: PathBuf,
        /// Chunk key (hex); when set the frame is decoded and verified
        #[arg(long, short = 'k')]
        key: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ZstorConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    if cli.debug {
        config.logging.debug = true;
    }

    init_logging(&config.logging);
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Push {
            local,
            chunk_size,
            refs,
        } => {
            let remote = open_remote(&config, cli.store.as_deref())?;
            cmd_push(&config, &remote, &local, chunk_size, refs.as_deref())
        }
        Commands::Pull { refs, dest } => {
            let remote = open_remote(&config, cli.store.as_deref())?;
            cmd_pull(&config, &remote, &refs, &dest)
        }
        Commands::Inspect { frame, key } => cmd_inspect(&config, &frame, key.as_deref()),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.effective_level()));

    // stdout carries chunk refs, so logs go to stderr
    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// `--store` wins over the config's `[remote]` section.
fn open_remote(config: &ZstorConfig, store: Option<&Path>) -> Result<Remote> {
    match store {
        Some(dir) => {
            let store = DirectoryStore::open(dir)
                .with_context(|| format!("opening store: {}", dir.display()))?;
            Ok(Remote::new(store))
        }
        None => build_remote(&config.remote).context("configuring remote"),
    }
}

fn make_codec(config: &ZstorConfig) -> ChunkCodec {
    ChunkCodec::new(CodecOptions::from(&config.codec))
}

// ── Progress display ──────────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_callback(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, msg| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(msg.to_string());
    })
}

// ── `zstor push` ──────────────────────────────────────────────────────────────

fn cmd_push(
    config: &ZstorConfig,
    remote: &Remote,
    local: &Path,
    chunk_size: Option<usize>,
    refs_out: Option<&Path>,
) -> Result<()> {
    let chunk_size = chunk_size.unwrap_or(config.chunking.chunk_size);
    anyhow::ensure!(chunk_size > 0, "--chunk-size must be > 0");
    anyhow::ensure!(
        chunk_size <= config.codec.max_chunk_size,
        "--chunk-size {chunk_size} exceeds codec.max_chunk_size {}",
        config.codec.max_chunk_size
    );

    let codec = make_codec(config);

    let refs = if remote.is_enabled() {
        eprintln!("Pushing {} → {remote:?}", local.display());

        let pb = make_progress_bar(0, "push");
        let progress = progress_callback(&pb);
        let result = engine::push_file(local, &codec, remote, chunk_size, Some(&progress))
            .with_context(|| format!("pushing {}", local.display()))?;
        pb.finish_with_message("done");

        if result.empty {
            eprintln!("  empty file, nothing stored");
        } else {
            eprintln!("  chunks:   {}", result.chunks.len());
            eprintln!("  bytes:    {}", fmt_bytes(result.bytes));
            eprintln!("  stored:   {}", fmt_bytes(result.frame_bytes));
            eprintln!("  uploaded: {} new, {} already present", result.uploaded, result.deduplicated);
        }
        result.chunks
    } else {
        eprintln!("No store configured; dry run for {}", local.display());

        let refs = dry_run_refs(local, &codec, chunk_size)?;
        let size: u64 = refs.iter().map(|r| r.size).sum();
        let framed: u64 = refs.iter().map(|r| r.frame_size).sum();
        eprintln!("  chunks:   {}", refs.len());
        eprintln!("  bytes:    {}", fmt_bytes(size));
        eprintln!("  framed:   {}", fmt_bytes(framed));
        refs
    };

    match refs_out {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating refs file: {}", path.display()))?;
            write_refs(BufWriter::new(file), &refs)
                .with_context(|| format!("writing refs file: {}", path.display()))?;
            eprintln!("  refs:     {}", path.display());
        }
        None => write_refs(std::io::stdout().lock(), &refs).context("writing refs to stdout")?,
    }

    Ok(())
}

/// Encode without storing; sizes come from the chunks actually read.
fn dry_run_refs(local: &Path, codec: &ChunkCodec, chunk_size: usize) -> Result<Vec<ChunkRef>> {
    let encoded = engine::encode_file(local, codec, chunk_size)
        .with_context(|| format!("encoding {}", local.display()))?;
    Ok(encoded.iter().map(|e| e.chunk_ref()).collect())
}

fn write_refs(mut out: impl Write, refs: &[ChunkRef]) -> Result<()> {
    for r in refs {
        serde_json::to_writer(&mut out, r)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

// ── `zstor pull` ──────────────────────────────────────────────────────────────

fn cmd_pull(config: &ZstorConfig, remote: &Remote, refs_path: &Path, dest: &Path) -> Result<()> {
    let refs = if refs_path == Path::new("-") {
        read_refs(std::io::stdin().lock()).context("reading refs from stdin")?
    } else {
        let file =
            File::open(refs_path).with_context(|| format!("opening refs: {}", refs_path.display()))?;
        read_refs(BufReader::new(file))
            .with_context(|| format!("reading refs: {}", refs_path.display()))?
    };

    eprintln!("Pulling {} chunks → {}", refs.len(), dest.display());

    let codec = make_codec(config);
    let pb = make_progress_bar(refs.len() as u64, "pull");
    let progress = progress_callback(&pb);
    let result = engine::pull_file(&refs, &codec, remote, dest, Some(&progress))
        .with_context(|| format!("pulling into {}", dest.display()))?;
    pb.finish_with_message("done");

    eprintln!("  chunks:  {}", result.chunks);
    eprintln!("  bytes:   {}", fmt_bytes(result.bytes));
    Ok(())
}

/// Parse JSON-lines chunk refs, skipping blank lines.
fn read_refs(input: impl BufRead) -> Result<Vec<ChunkRef>> {
    let mut refs = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let r: ChunkRef = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid chunk ref", lineno + 1))?;
        refs.push(r);
    }
    Ok(refs)
}

// ── `zstor inspect` ───────────────────────────────────────────────────────────

fn cmd_inspect(config: &ZstorConfig, path: &Path, key: Option<&str>) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading frame: {}", path.display()))?;
    let frame = Frame::parse(&bytes).with_context(|| format!("parsing frame: {}", path.display()))?;

    let recorded = frame.checksum();
    let computed = frame.computed_checksum();
    println!("frame:      {}", path.display());
    println!("size:       {}", fmt_bytes(bytes.len() as u64));
    println!("id:         {}", zstor_chunks::digest_hex(frame.ciphertext()));
    println!("ciphertext: {} bytes", frame.ciphertext().len());
    println!(
        "checksum:   {recorded:08x} ({})",
        if recorded == computed {
            "ok".to_string()
        } else {
            format!("MISMATCH, computed {computed:08x}")
        }
    );

    if let Some(key) = key {
        let plain = make_codec(config)
            .decode_frame(&bytes, key)
            .context("decoding frame")?;
        println!("plaintext:  {} (integrity ok)", fmt_bytes(plain.len() as u64));
    }
    Ok(())
}

// ── `zstor config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &ZstorConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    if config.remote.kind == RemoteKind::Disabled {
        println!("# No remote configured: push is a dry run unless --store is given");
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
