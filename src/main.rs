use clap::{Parser, Subcommand};
use renditions::imaging::RustBackend;
use renditions::{FsStore, ScaledImageGenerator, Uploader, config, format, output};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "renditions")]
#[command(version)]
#[command(about = "Validate image uploads and store scaled renditions")]
#[command(long_about = "\
Validate image uploads and store scaled renditions

Every accepted image (JPEG or PNG, by file extension) is decoded once and
re-encoded at each configured tier, in the same format as the upload:

  dawn.jpg ─▶ 3f2a9c0d1e4b5a67/large.jpeg    (factor 1.0)
           ─▶ 3f2a9c0d1e4b5a67/medium.jpeg   (factor 0.5)
           ─▶ 3f2a9c0d1e4b5a67/small.jpeg    (factor 0.25)
           ─▶ 3f2a9c0d1e4b5a67/thumb.jpeg    (long edge 160px)

The directory name is a digest of the upload bytes, so re-uploading an image
rewrites the same objects.

Configuration is read from ./renditions.toml when present, or from --config.
Run 'renditions gen-config' to print a documented config file.")]
struct Cli {
    /// Config file [default: ./renditions.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage root directory (overrides [storage] root)
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Log debug output for every tier and stored object
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the format and MIME type each filename resolves to
    Resolve {
        #[arg(required = true)]
        filenames: Vec<String>,
    },
    /// Generate renditions in memory and list them without storing
    Check {
        /// Image files or directories (scanned recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Generate renditions and store them in a bucket
    Upload {
        /// Image files or directories (scanned recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target bucket (overrides [storage] bucket)
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Print a stock renditions.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "renditions=debug".to_string()
        } else {
            "renditions=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Resolve { filenames } => {
            let mut failures = 0;
            for (i, name) in filenames.iter().enumerate() {
                let result = format::resolve(name);
                failures += usize::from(result.is_err());
                println!("{}", output::format_resolve_line(i + 1, name, &result));
            }
            fail_if_any(failures, filenames.len())?;
        }
        Command::Check { paths } => {
            let config = load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let generator = build_generator(&config)?;

            let inputs = collect_inputs(&paths)?;
            let mut failures = 0;
            for (i, path) in inputs.iter().enumerate() {
                let name = display_name(path);
                let lines = match check_file(&generator, i + 1, path, &name) {
                    Ok(lines) => lines,
                    Err(e) => {
                        failures += 1;
                        output::format_failure(i + 1, &name, e.as_ref())
                    }
                };
                for line in lines {
                    println!("{}", line);
                }
            }
            fail_if_any(failures, inputs.len())?;
        }
        Command::Upload { paths, bucket } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(root) = cli.storage_root {
                config.storage.root = root;
            }
            if let Some(bucket) = bucket {
                config.storage.bucket = bucket;
            }
            config.validate()?;
            init_thread_pool(&config.processing);

            let uploader = Uploader::new(
                build_generator(&config)?,
                FsStore::new(&config.storage.root),
            );
            let bucket = config.storage.bucket.as_str();

            let inputs = collect_inputs(&paths)?;
            let mut reports = Vec::new();
            let mut failures = 0;
            for (i, path) in inputs.iter().enumerate() {
                let name = display_name(path);
                let result = std::fs::read(path)
                    .map_err(Box::<dyn std::error::Error>::from)
                    .and_then(|bytes| Ok(uploader.upload(bucket, &name, &bytes)?));
                let lines = match result {
                    Ok(report) => {
                        let lines = output::format_upload_report(i + 1, &report);
                        reports.push(report);
                        lines
                    }
                    Err(e) => {
                        failures += 1;
                        output::format_failure(i + 1, &name, e.as_ref())
                    }
                };
                for line in lines {
                    println!("{}", line);
                }
            }
            println!();
            println!("{}", output::format_upload_summary(&reports, failures));
            println!("Stored under {}", config.storage.root.join(bucket).display());
            fail_if_any(failures, inputs.len())?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config` if given, otherwise `./renditions.toml` or stock defaults.
fn load_config(path: Option<&Path>) -> Result<config::Config, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

fn build_generator(
    config: &config::Config,
) -> Result<ScaledImageGenerator<RustBackend>, renditions::GenerateError> {
    ScaledImageGenerator::from_config(
        RustBackend::new(),
        &config.renditions,
        config.processing.parallel_tiers,
    )
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Expand directories into the supported image files they contain, sorted
/// by path. Explicit file arguments are kept as given so unsupported names
/// are reported rather than skipped.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut inputs = Vec::new();
    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file()
                && format::is_supported(&entry.file_name().to_string_lossy())
            {
                inputs.push(entry.into_path());
            }
        }
    }
    Ok(inputs)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn check_file(
    generator: &ScaledImageGenerator<RustBackend>,
    index: usize,
    path: &Path,
    name: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let (format, mime) = format::resolve(name)?;
    let bytes = std::fs::read(path)?;
    let renditions = generator.generate(&bytes, mime)?;
    Ok(output::format_check_output(index, name, format, &renditions))
}

fn fail_if_any(failures: usize, total: usize) -> Result<(), Box<dyn std::error::Error>> {
    if failures > 0 {
        return Err(format!("{failures} of {total} inputs failed").into());
    }
    Ok(())
}
