use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jem_analysis::{CaretAnalyzer, ExtractOptions, JarAnalyzer, Project};
use jem_cache::{cache_key, CacheConfig, ClassDocument, ExceptionCache, ExceptionStore, FsStore};
use jem_classpath::ClasspathEntry;
use jem_config::JemConfig;
use jem_core::{
    CallManifest, Callable, DiscoveryMap, ManifestCall, ManifestFrontEnd, MethodInformation,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "jem",
    version,
    about = "Discover the exceptions calls to compiled JVM methods may throw"
)]
struct Cli {
    /// Config file (defaults to `jem.toml` in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Cache directory (overrides config and `JEM_CACHE_DIR`)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exceptions of every call in a call manifest, grouped by exception type
    Analyze(AnalyzeArgs),
    /// Exceptions of a single method, e.g. `java.util.List.get(I)Ljava/lang/Object;`
    Method(MethodArgs),
    /// Scan a jar, jmod or class directory into the cache
    Scan(ScanArgs),
    /// Inspect or edit cached results
    Cache(CacheArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// JSON call manifest produced by an editor front end
    #[arg(long)]
    calls: PathBuf,
    /// Start offset of the selection (inclusive)
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// End offset of the selection (exclusive); defaults to the end of the file
    #[arg(long)]
    end: Option<usize>,
    /// Project classpath entry; may be repeated
    #[arg(long = "classpath", value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MethodArgs {
    /// `owner.name(descriptor)return`
    method: String,
    /// Container holding the owner class, used when the classpath does not
    #[arg(long)]
    jar: Option<PathBuf>,
    /// Project classpath entry; may be repeated
    #[arg(long = "classpath", value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Jar, jmod or class directory
    container: PathBuf,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
    /// Emit JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Print the cache file a class is stored in
    Path { class: String },
    /// Print the cached results of a class
    Show { class: String },
    /// Delete the cached results of a class
    Clean { class: String },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

struct Session {
    config: JemConfig,
    store: FsStore,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => JemConfig::load_from_path(path)?,
            None => jem_config::load_for_dir(&std::env::current_dir()?)?.0,
        };
        jem_config::init_tracing(&config.logging);

        let root = match cli.cache_dir.clone().or_else(|| config.cache_root()) {
            Some(root) => root,
            None => CacheConfig::default().root()?,
        };
        let store = FsStore::new(&root)
            .with_context(|| format!("failed to open cache at {}", root.display()))?;
        tracing::debug!(target: "jem.cli", cache = %root.display(), "cache opened");
        Ok(Self { config, store })
    }

    fn extract_options(&self) -> ExtractOptions {
        let analysis = &self.config.analysis;
        ExtractOptions {
            declared: analysis.declared,
            thrown: analysis.thrown,
            follow_invocations: analysis.follow_invocations,
        }
    }

    fn caret_analyzer(&self, classpath: &[PathBuf]) -> CaretAnalyzer<ManifestFrontEnd, &FsStore> {
        let project = Project::new(classpath.iter().map(ClasspathEntry::from_path).collect());
        CaretAnalyzer::new(
            ManifestFrontEnd,
            project,
            ExceptionCache::new(&self.store),
            JarAnalyzer::new(self.extract_options()),
        )
    }
}

fn run(cli: Cli) -> Result<i32> {
    let session = Session::open(&cli)?;
    match cli.command {
        Command::Analyze(args) => {
            let text = std::fs::read_to_string(&args.calls)
                .with_context(|| format!("failed to read {}", args.calls.display()))?;
            let manifest = CallManifest::from_json(&text)
                .with_context(|| format!("invalid call manifest {}", args.calls.display()))?;

            let mut analyzer = session.caret_analyzer(&args.classpath);
            let end = args.end.unwrap_or(usize::MAX);
            let found = analyzer.analyze(&manifest, args.start, end);
            print_discoveries(&found, args.json)?;
            Ok(0)
        }
        Command::Method(args) => {
            let method: MethodInformation = args.method.parse()?;
            let mut analyzer = session.caret_analyzer(&args.classpath);
            let exceptions = analyzer.exceptions_for(&method, args.jar.as_deref());
            if args.json {
                print_json(&MethodReport {
                    method: method.to_string(),
                    exceptions,
                })?;
            } else {
                for exception in &exceptions {
                    println!("{exception}");
                }
            }
            Ok(0)
        }
        Command::Scan(args) => {
            let cache = ExceptionCache::new(&session.store);
            let entry = ClasspathEntry::from_path(&args.container);
            let classes = JarAnalyzer::new(session.extract_options()).analyze(&entry, &cache)?;
            if args.json {
                print_json(&ScanReport {
                    container: &args.container,
                    classes,
                })?;
            } else {
                println!("scanned {}: {} classes", args.container.display(), classes.len());
            }
            Ok(0)
        }
        Command::Cache(args) => run_cache(&session.store, args.command, args.json),
    }
}

fn run_cache(store: &FsStore, command: CacheCommand, json: bool) -> Result<i32> {
    match command {
        CacheCommand::Path { class } => {
            let path = store.path_for(&class);
            if json {
                print_json(&serde_json::json!({ "class": cache_key(&class), "path": path }))?;
            } else {
                println!("{}", path.display());
            }
            Ok(0)
        }
        CacheCommand::Show { class } => {
            let Some(entries) = store.get(&class) else {
                eprintln!("{class}: not cached");
                return Ok(1);
            };
            let document = ClassDocument::new(&cache_key(&class), &entries);
            if json {
                print_json(&document)?;
            } else {
                println!("{}", document.class);
                for record in &document.methods {
                    let owner = record.class.as_deref().unwrap_or(&document.class);
                    println!(
                        "  {owner}.{}{}: {}",
                        record.name,
                        record.descriptor,
                        record.exceptions.join(", ")
                    );
                }
            }
            Ok(0)
        }
        CacheCommand::Clean { class } => {
            store.remove(&class)?;
            if json {
                print_json(&serde_json::json!({ "ok": true }))?;
            } else {
                println!("cache: removed {}", store.path_for(&class).display());
            }
            Ok(0)
        }
    }
}

#[derive(Serialize)]
struct MethodReport {
    method: String,
    exceptions: BTreeSet<String>,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    container: &'a Path,
    classes: BTreeSet<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_discoveries(found: &DiscoveryMap<ManifestCall>, json: bool) -> Result<()> {
    if json {
        return print_json(found);
    }
    for (exception, discoveries) in found {
        println!("{exception}");
        for discovery in discoveries {
            let target = discovery
                .method
                .method_identity()
                .map(|m| m.to_string())
                .unwrap_or_else(|| discovery.method.name().to_string());
            println!(
                "  {}: {} -> {target}",
                discovery.call_site.offset, discovery.call_site.text
            );
        }
    }
    Ok(())
}
