use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reportsync_artifact::{
    fingerprint_contents, fingerprint_normalized, normalize_folder_path, ChangeDetector,
    MetricsDocument,
};
use reportsync_cache::{CacheStore, DiskCacheStore};
use reportsync_core::{
    BaselineFileAnalysis, DocumentSource, EngineConfig, FlatDirectorySource, OfflineEvaluator,
    UpdateOrchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "REPORTSYNC_LOG";
const DEFAULT_CACHE_DIR: &str = ".reportsync-cache";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cli() -> Command {
    Command::new("reportsync")
        .version(reportsync_core::VERSION)
        .about("Incremental metrics report updates with cached chart artifacts")
        .subcommand_required(true)
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("update")
                .about("Apply new metrics and report to a folder's cached result")
                .arg(
                    Arg::new("folder")
                        .long("folder")
                        .required(true)
                        .help("Folder holding the source documents"),
                )
                .arg(
                    Arg::new("metrics")
                        .long("metrics")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Metrics document (JSON)"),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Report text (markdown)"),
                )
                .arg(
                    Arg::new("baseline")
                        .long("baseline")
                        .value_parser(value_parser!(PathBuf))
                        .help("Analysis result (JSON) used when nothing is cached"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                ),
        )
        .subcommand(
            Command::new("diff")
                .about("Print the metrics that changed between two documents")
                .arg(
                    Arg::new("old")
                        .long("old")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("new")
                        .long("new")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Metric to ignore; may be repeated"),
                ),
        )
        .subcommand(
            Command::new("fingerprint")
                .about("Print the folder and content fingerprints")
                .arg(Arg::new("folder").long("folder").required(true))
                .arg(
                    Arg::new("ext")
                        .long("ext")
                        .action(ArgAction::Append)
                        .help("Document extension; defaults to pdf"),
                ),
        )
}

fn read_metrics(path: &Path) -> anyhow::Result<MetricsDocument> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(MetricsDocument::from_json_str(&raw)?)
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a T> {
    args.get_one::<T>(id)
        .with_context(|| format!("missing --{id}"))
}

async fn run_update(args: &ArgMatches) -> anyhow::Result<()> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let folder = required::<String>(args, "folder")?;
    let metrics = read_metrics(required::<PathBuf>(args, "metrics")?)?;
    let report_path = required::<PathBuf>(args, "report")?;
    let report = std::fs::read_to_string(report_path)
        .with_context(|| format!("reading {}", report_path.display()))?;

    let cache_dir = config
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let cache: Arc<dyn CacheStore> = Arc::new(DiskCacheStore::new(cache_dir));
    let full_analysis = match args.get_one::<PathBuf>("baseline") {
        Some(path) => BaselineFileAnalysis::new(path),
        None => BaselineFileAnalysis::none(),
    };

    let orchestrator = UpdateOrchestrator::new(&config, cache, Arc::new(full_analysis), Arc::new(OfflineEvaluator));
    let result = orchestrator.update(folder, metrics, report).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_diff(args: &ArgMatches) -> anyhow::Result<()> {
    let old = read_metrics(required::<PathBuf>(args, "old")?)?;
    let new = read_metrics(required::<PathBuf>(args, "new")?)?;
    let excluded = args
        .get_many::<String>("exclude")
        .into_iter()
        .flatten()
        .cloned();
    let changes = ChangeDetector::with_excluded(excluded).detect(&old, &new);
    println!("{}", serde_json::to_string_pretty(&changes)?);
    Ok(())
}

fn run_fingerprint(args: &ArgMatches) -> anyhow::Result<()> {
    let folder = normalize_folder_path(required::<String>(args, "folder")?);
    let extensions: Vec<String> = match args.get_many::<String>("ext") {
        Some(exts) => exts.cloned().collect(),
        None => vec!["pdf".to_string()],
    };
    let files = FlatDirectorySource::new(extensions)
        .discover(&folder)
        .with_context(|| format!("listing {}", folder.display()))?;
    let content = fingerprint_contents(&files)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "folder": folder,
            "folder_fingerprint": fingerprint_normalized(&folder),
            "content_fingerprint": content,
            "documents": files.len(),
        }))?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("update", args)) => run_update(args).await,
        Some(("diff", args)) => run_diff(args),
        Some(("fingerprint", args)) => run_fingerprint(args),
        _ => unreachable!("subcommand_required is set"),
    }
}
