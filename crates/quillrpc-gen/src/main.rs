use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context as _};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quillrpc_gen::{generate, output_file_name, EmitOptions};
use quillrpc_parser::{EndpointCase, PackageInfo};

/// Search-path environment variable: colon-separated directories tried when
/// an import resolves neither relatively nor under `vendor/`.
const SEARCH_PATH_ENV: &str = "QUILLRPC_PATH";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Case {
    None,
    Lower,
    Snake,
    Url,
    Dot,
}

impl From<Case> for EndpointCase {
    fn from(case: Case) -> Self {
        match case {
            Case::None => EndpointCase::None,
            Case::Lower => EndpointCase::Lower,
            Case::Snake => EndpointCase::Snake,
            Case::Url => EndpointCase::Url,
            Case::Dot => EndpointCase::Dot,
        }
    }
}

/// Generate JSON-RPC dispatch and SMD schema code for annotated services.
#[derive(Debug, Parser)]
#[command(name = "quillrpc-gen", version)]
struct Cli {
    /// Any source file of the target package.
    #[arg(env = "QUILLRPC_ENTRY")]
    entry: PathBuf,

    /// Progress output; pass --verbose=false for errors only.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    verbose: bool,

    /// Case transform applied to method routing names.
    #[arg(long, value_enum, default_value_t = Case::Lower)]
    case: Case,

    /// Separator between namespace and method in wire method names.
    #[arg(long, default_value_t = '.')]
    separator: char,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let start = Instant::now();
    let case = EndpointCase::from(cli.case);

    if case.separator() == Some(cli.separator) {
        warn!(
            separator = %cli.separator,
            "endpoint case inserts the scope separator into method names; routing will split on the wrong dot"
        );
    }

    info!(entry = %cli.entry.display(), "analyzing");

    let search_paths = search_paths();
    let package = PackageInfo::parse(&cli.entry, &search_paths, case)
        .with_context(|| format!("analyzing {}", cli.entry.display()))?;

    if package.services.is_empty() {
        info!("services not found");
        return Ok(());
    }

    let source = generate(&package, &EmitOptions { separator: cli.separator });

    // The emitted file must round-trip through the host parser; failing here
    // is a generator bug surfaced before anything lands on disk.
    if let Err(err) = syn::parse_file(&source) {
        bail!("generated source does not parse: {err}");
    }

    let output = package.dir.join(output_file_name(&package));
    std::fs::write(&output, &source).with_context(|| format!("writing {}", output.display()))?;

    info!(output = %output.display(), elapsed = ?start.elapsed(), "generated");
    print_summary(&package);

    Ok(())
}

fn search_paths() -> Vec<PathBuf> {
    std::env::var(SEARCH_PATH_ENV)
        .map(|raw| raw.split(':').filter(|s| !s.is_empty()).map(PathBuf::from).collect())
        .unwrap_or_default()
}

fn print_summary(package: &PackageInfo) {
    info!("generated services for package {}:", package.name);
    for service in &package.services {
        info!("- {}", service.name);
        for method in &service.methods {
            let args = method
                .args
                .iter()
                .map(|arg| format!("{} {}", arg.name, arg.ty.spelling))
                .collect::<Vec<_>>()
                .join(", ");

            match &method.returns.data {
                Some(data) => info!("  * {}({args}) -> {}", method.name, data.spelling),
                None => info!("  * {}({args})", method.name),
            }
        }
    }
}
