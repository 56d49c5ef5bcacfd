use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use badge_tools::background::DEFAULT_TOLERANCE;
use badge_tools::badges::DEFAULT_BADGE_DIR;
use badge_tools::{
    discover_candidates, strip_badges, BackgroundRemover, BatchConfig, CornerKeyRemover,
    RemoveBgClient, RemoveBgConfig, SkipSet,
};

#[derive(Clone, Copy, ValueEnum)]
enum RemoverKind {
    /// Corner-keyed flood fill, runs offline
    Local,
    /// remove.bg API (needs REMOVE_BG_API_KEY)
    RemoveBg,
}

#[derive(Parser)]
#[command(
    name = "strip-badges",
    about = "Make badge image backgrounds transparent, in place",
    version,
    after_help = "Files named in the skip-set are treated as already processed and left untouched.\n\
                  Per-file failures are reported but do not change the exit status."
)]
struct Cli {
    /// Directory of badge images
    #[arg(short, long, default_value = DEFAULT_BADGE_DIR)]
    dir: PathBuf,

    /// Extra skip list, one filename per line (repeatable)
    #[arg(long)]
    skip_file: Vec<PathBuf>,

    /// Do not apply the built-in list of processed badges
    #[arg(long)]
    no_default_skip: bool,

    /// Background removal backend
    #[arg(long, value_enum, default_value_t = RemoverKind::Local)]
    remover: RemoverKind,

    /// Per-channel colour tolerance for the local remover
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: u8,

    /// List the files that would be processed and exit
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> badge_tools::Result<BatchConfig> {
    let mut skip = if cli.no_default_skip {
        SkipSet::new()
    } else {
        SkipSet::builtin()
    };
    for path in &cli.skip_file {
        let extra = SkipSet::load(path)?;
        log::debug!("Loaded {} name(s) from {}", extra.len(), path.display());
        skip.extend(extra.iter());
    }
    Ok(BatchConfig::new(&cli.dir).with_skip(skip))
}

fn build_remover(cli: &Cli) -> badge_tools::Result<Box<dyn BackgroundRemover>> {
    Ok(match cli.remover {
        RemoverKind::Local => Box::new(CornerKeyRemover::new(cli.tolerance)),
        RemoverKind::RemoveBg => Box::new(RemoveBgClient::new(&RemoveBgConfig::from_env())?),
    })
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if dotenv::dotenv().is_err() {
        log::debug!("No .env file found, using process environment");
    }

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if cli.dry_run {
        match discover_candidates(&config) {
            Ok(files) => {
                for name in &files {
                    println!("{name}");
                }
                eprintln!("{} file(s) would be processed", files.len());
            }
            Err(e) => {
                eprintln!("Error: cannot read {}: {e}", config.badge_dir.display());
                process::exit(1);
            }
        }
        return;
    }

    let remover = match build_remover(&cli) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = strip_badges(&config, &*remover, &mut stdout) {
        eprintln!("Error: cannot process {}: {e}", config.badge_dir.display());
        process::exit(1);
    }
}
