//! `srcnav` command line: build and query a project's symbol index and list
//! the lines a project's defines switch off.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use srcnav_config::WorkspaceConfig;
use srcnav_preproc::{DecorationTarget, Defines, FoldRange, LineDecoration, plan_for_text};
use srcnav_symbols::{
    BuildPhase, BuildProgress, IndexSession, LineIndex, Position, Symbol, SymbolKind,
};
use srcnav_workspace::DirectoryScanner;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srcnav")]
#[command(about = "Symbol navigation for C/C++ and Python source trees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write or update the workspace configuration of a project
    Init(InitArgs),
    /// Scan a project and rebuild its symbol index
    Build(BuildArgs),
    /// Look up definitions by name
    Find(FindArgs),
    /// Resolve the identifier at a file position to its definitions
    Goto(GotoArgs),
    /// List the lines of a file that the project's defines disable
    Inactive(InactiveArgs),
}

#[derive(Args)]
struct InitArgs {
    /// Project root
    root: PathBuf,

    /// Extra directory name to skip while scanning (repeatable)
    #[arg(long = "ignore")]
    ignore: Vec<String>,

    /// Defines file, relative to the root
    #[arg(long)]
    defines: Option<String>,

    /// Fold inactive regions by default
    #[arg(long)]
    fold: bool,
}

#[derive(Args)]
struct BuildArgs {
    /// Project root
    root: PathBuf,

    /// Print the build summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FindArgs {
    /// Project root
    root: PathBuf,

    /// Symbol name (exact match)
    name: String,

    /// Only report symbols of this kind
    #[arg(long)]
    kind: Option<SymbolKind>,

    /// Treat the name as a case-insensitive prefix
    #[arg(long)]
    prefix: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GotoArgs {
    /// Project root
    root: PathBuf,

    /// File containing the reference
    file: PathBuf,

    /// 1-based line
    line: usize,

    /// 1-based column
    column: usize,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InactiveArgs {
    /// Source file to analyze
    file: PathBuf,

    /// Project root used to locate the workspace configuration [default: current directory]
    #[arg(long)]
    root: Option<PathBuf>,

    /// Defines file overriding the configured one
    #[arg(long)]
    defines: Option<PathBuf>,

    /// Additional define (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    define: Vec<String>,

    /// Also report foldable ranges
    #[arg(long)]
    fold: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init(args) => run_init(args),
        Commands::Build(args) => run_build(args),
        Commands::Find(args) => run_find(args),
        Commands::Goto(args) => run_goto(args),
        Commands::Inactive(args) => run_inactive(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn project_root(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Cannot access project root {}", path.display()))
}

fn load_config(root: &Path) -> Result<WorkspaceConfig> {
    WorkspaceConfig::load_or_default(root).with_context(|| {
        format!("Failed to load workspace configuration for {}", root.display())
    })
}

fn load_session(root: &Path) -> Result<IndexSession> {
    let mut session = IndexSession::new();
    let found = session
        .load_persisted(root)
        .with_context(|| format!("Failed to load symbol index for {}", root.display()))?;
    if !found {
        bail!(
            "No symbol index for {}; run `srcnav build` first",
            root.display()
        );
    }
    Ok(session)
}

fn run_init(args: InitArgs) -> Result<()> {
    let root = project_root(&args.root)?;
    let mut config = load_config(&root)?;

    for dir in args.ignore {
        let dir = dir.trim().to_string();
        if !dir.is_empty() && !config.ignored_directories.contains(&dir) {
            config.ignored_directories.push(dir);
        }
    }
    if let Some(defines) = args.defines {
        config.defines_file = Some(defines);
    }
    if args.fold {
        config.fold_inactive_regions = true;
    }

    config
        .save(&root)
        .with_context(|| format!("Failed to save workspace configuration for {}", root.display()))?;
    println!("{config}");
    Ok(())
}

fn run_build(args: BuildArgs) -> Result<()> {
    let root = project_root(&args.root)?;
    let config = load_config(&root)?;
    let scanner = DirectoryScanner::new().with_ignored_directories(config.ignored_directories());

    let mut session = IndexSession::new().with_scanner(scanner);
    let summary = session
        .build_full(&root, &mut |progress: BuildProgress| match progress.phase {
            BuildPhase::Parsing => tracing::debug!(%progress, "indexing"),
            _ => tracing::info!(%progress, "indexing"),
        })
        .with_context(|| format!("Failed to build symbol index for {}", root.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Indexed {} symbols from {} files ({} skipped)",
            summary.symbols, summary.files_scanned, summary.files_skipped
        );
    }
    Ok(())
}

fn run_find(args: FindArgs) -> Result<()> {
    let root = project_root(&args.root)?;
    let session = load_session(&root)?;
    let index = session.get_all();

    let mut found: Vec<&Symbol> = if args.prefix {
        index
            .search_prefix(&args.name)
            .into_iter()
            .flat_map(|(_, symbols)| symbols.iter())
            .collect()
    } else {
        index.find_by_name(&args.name).iter().collect()
    };
    if let Some(kind) = args.kind {
        found.retain(|symbol| symbol.kind == kind);
    }

    print_symbols(&found, args.json)
}

fn run_goto(args: GotoArgs) -> Result<()> {
    let root = project_root(&args.root)?;
    let session = load_session(&root)?;
    let content = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let position = Position {
        line: args.line,
        column: args.column,
    };
    let offset = LineIndex::new(&content).offset(position).with_context(|| {
        format!("{}:{} is outside the file", args.file.display(), args.line)
    })?;

    let found: Vec<&Symbol> = session
        .definitions_at(&args.file, &content, offset)
        .iter()
        .collect();
    print_symbols(&found, args.json)
}

fn print_symbols(symbols: &[&Symbol], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(symbols)?);
        return Ok(());
    }
    if symbols.is_empty() {
        eprintln!("No definitions found");
    }
    for symbol in symbols {
        match &symbol.signature {
            Some(signature) => println!("{}: {} {}  {}", symbol.location(), symbol.kind, symbol.name, signature),
            None => println!("{}: {} {}", symbol.location(), symbol.kind, symbol.name),
        }
    }
    Ok(())
}

fn run_inactive(args: InactiveArgs) -> Result<()> {
    let root = match &args.root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Cannot determine the current directory")?,
    };
    let config = load_config(&root)?;

    let mut defines = match &args.defines {
        Some(path) => Defines::read(path)?,
        None => Defines::load(config.defines_path(&root)),
    };
    add_defines(&mut defines, &args.define)?;
    tracing::debug!(defines = defines.len(), "loaded defines");

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let plan = plan_for_text(&text, &defines, args.fold || config.fold_inactive_regions);

    let mut report = InactiveReport::default();
    plan.apply_to(&mut report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    let lines: Vec<&str> = text.split('\n').collect();
    for &line in &report.lines {
        let source = lines.get(line - 1).map_or("", |l| l.trim_end_matches('\r'));
        println!("{}:{}: {}", args.file.display(), line, source);
    }
    for fold in &report.folds {
        println!("fold {}-{}", fold[0], fold[1]);
    }
    Ok(())
}

/// Apply `NAME` / `NAME=VALUE` flags on top of the loaded defines.
fn add_defines(defines: &mut Defines, flags: &[String]) -> Result<()> {
    for flag in flags {
        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.to_string())),
            None => (flag.trim(), None),
        };
        if name.is_empty() {
            bail!("Invalid define {flag:?}: missing name");
        }
        defines.insert(name, value);
    }
    Ok(())
}

/// Inactive lines and folds in 1-based editor numbering.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
struct InactiveReport {
    lines: Vec<usize>,
    folds: Vec<[usize; 2]>,
}

impl DecorationTarget for InactiveReport {
    fn set_inactive_lines(&mut self, decorations: &[LineDecoration]) {
        self.lines = decorations.iter().map(|d| d.line + 1).collect();
    }

    fn set_folds(&mut self, folds: &[FoldRange]) {
        self.folds = folds.iter().map(|f| [f.start + 1, f.end + 1]).collect();
    }
}
