use anyhow::{Context, Result, bail};
use clap::Parser;
use proto_semver::compat::{DiagnosticLevel, rule_registry};
use proto_semver::compiler::CompilerKind;
use proto_semver::{
    CompileOutcome, Config, DescriptorSet, SchemaCompiler, SchemaVersion, SchemaVersioner,
    SemverSchemaVersioner, SourceFile, ValidationEngine, ValidationReport, Violation,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "proto-semver")]
#[command(about = "Validate protobuf schema changes and compute package versions")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Validate a candidate schema tree against the current one")]
    Validate {
        #[arg(long, help = "Directory with the published .proto files")]
        current: PathBuf,
        #[arg(long, help = "Directory with the proposed .proto files")]
        candidate: PathBuf,
        #[arg(long, help = "YAML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Output format", value_enum, default_value = "text")]
        format: OutputFormat,
        #[arg(long, help = "Compiler to use (overrides the configuration)", value_enum)]
        compiler: Option<CompilerArg>,
    },
    #[command(about = "Compute the next version of a package")]
    Version {
        #[arg(long, help = "Fully-qualified package name, e.g. foo.bar.v2")]
        package: String,
        #[arg(long, help = "Currently published version (X.Y.Z)")]
        current_version: Option<SchemaVersion>,
        #[arg(long, help = "Directory with the published .proto files")]
        current: PathBuf,
        #[arg(long, help = "Directory with the proposed .proto files")]
        candidate: PathBuf,
        #[arg(long, help = "YAML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Compiler to use (overrides the configuration)", value_enum)]
        compiler: Option<CompilerArg>,
    },
    #[command(about = "List registered validation rules")]
    Rules,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CompilerArg {
    Protoc,
    Pure,
}

impl From<CompilerArg> for CompilerKind {
    fn from(arg: CompilerArg) -> Self {
        match arg {
            CompilerArg::Protoc => CompilerKind::Protoc,
            CompilerArg::Pure => CompilerKind::Pure,
        }
    }
}

fn load_config(path: Option<&Path>, compiler: Option<CompilerArg>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_yaml_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => Config::default(),
    };
    if let Some(compiler) = compiler {
        config.compiler.kind = compiler.into();
    }
    Ok(config)
}

/// Reads every `.proto` file below `root`, keyed by its `/`-separated path
/// relative to `root`.
fn load_sources(root: &Path) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "proto") {
            continue;
        }
        let relative = path.strip_prefix(root)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        sources.push(SourceFile::new(name, content));
    }
    tracing::debug!(root = %root.display(), files = sources.len(), "loaded sources");
    Ok(sources)
}

/// Compiles the tree below `root` and builds a graph of its own files.
fn build_set(compiler: &dyn SchemaCompiler, root: &Path) -> Result<DescriptorSet> {
    let sources = load_sources(root)?;
    if sources.is_empty() {
        return Ok(DescriptorSet::empty());
    }
    let own: HashSet<String> = sources.iter().map(|s| s.path.clone()).collect();
    match compiler.compile(&sources)? {
        CompileOutcome::Compiled(bytes) => {
            Ok(DescriptorSet::from_bytes(&bytes, |name| own.contains(name))?)
        }
        CompileOutcome::Failed(diagnostics) => {
            bail!("Failed to compile '{}':\n{}", root.display(), diagnostics)
        }
    }
}

fn location(violation: &Violation) -> String {
    let path = violation.file_path.as_deref().unwrap_or("<unknown>");
    match (violation.line, violation.column) {
        (Some(line), Some(column)) => format!("{path}:{line}:{column}"),
        (Some(line), None) => format!("{path}:{line}"),
        _ => path.to_string(),
    }
}

fn print_text(report: &ValidationReport) {
    if report.violations.is_empty() {
        println!("No violations found.");
    }
    for violation in &report.violations {
        let old = if violation.references_old { " (current)" } else { "" };
        println!("{} {}{} {}", violation.kind, location(violation), old, violation.description);
    }
    for diagnostic in &report.diagnostics {
        let level = match diagnostic.level {
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        eprintln!("{level}: [{}] {}", diagnostic.rule_id, diagnostic.message);
    }
    if !report.violations.is_empty() {
        println!();
        println!("Summary:");
        for (kind, count) in report.summary() {
            println!("  {kind}: {count}");
        }
        println!("  Rules executed: {}", report.executed_rules.len());
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Validate {
            current,
            candidate,
            config,
            format,
            compiler,
        } => {
            let config = load_config(config.as_deref(), compiler)?;
            let engine = ValidationEngine::from_config(&config.validation)?;
            let compiler = config.compiler.build();

            let current = build_set(compiler.as_ref(), &current)?;
            let candidate = build_set(compiler.as_ref(), &candidate)?;
            let report = engine.validate(&current, &candidate);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_text(&report),
            }

            if config.validation.fails(&report) {
                std::process::exit(1);
            }
        }
        Commands::Version {
            package,
            current_version,
            current,
            candidate,
            config,
            compiler,
        } => {
            let config = load_config(config.as_deref(), compiler)?;
            let compiler = config.compiler.build();

            let current = build_set(compiler.as_ref(), &current)?;
            let candidate = build_set(compiler.as_ref(), &candidate)?;
            let next = SemverSchemaVersioner.determine_version(
                &package,
                current_version,
                &current,
                &candidate,
            );
            println!("{next}");
        }
        Commands::Rules => {
            for id in rule_registry::rule_ids() {
                let marker = if rule_registry::is_default_rule(id) { "default" } else { "opt-in" };
                println!("{id:<28} {marker}");
            }
        }
    }

    Ok(())
}
