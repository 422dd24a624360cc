use clap::{Arg, ArgAction, ArgMatches, Command};
use marki18n::{Config, collect_entries, process_files};
use marki18n_mt::{
    ExtractQueue, FlushPolicy, MockMode, MockTranslator, ProviderRegistry, TranslationOrchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();

    let matches = Command::new("marki18n")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mark, extract and translate natural-language text in JS/TS/Vue sources")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Path to a marki18n.toml configuration file"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .global(true)
                .help("Use the mock translator instead of the configured provider")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about("Mark and extract the given files, then update the dictionaries")
                .arg(
                    Arg::new("files")
                        .help("Source files (.js, .jsx, .ts, .tsx, .vue)")
                        .required(true)
                        .num_args(1..),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .help("Rewrite marked sources in place")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("translate").about("Translate every key missing from the ledger"),
        )
        .subcommand(
            Command::new("refresh")
                .about("Regenerate the target-language dictionaries from the ledger"),
        )
        .get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    let registry = if matches.get_flag("mock") {
        ProviderRegistry::new().with_primary(Arc::new(MockTranslator::new(MockMode::Suffix)))
    } else {
        ProviderRegistry::from_config(&config.translate)?
    };

    match matches.subcommand() {
        Some(("run", sub)) => {
            let files: Vec<PathBuf> = sub
                .get_many::<String>("files")
                .into_iter()
                .flatten()
                .map(PathBuf::from)
                .collect();
            run(config, registry, &files, sub.get_flag("write")).await
        }
        Some(("translate", _)) => translate(config, registry).await,
        Some(("refresh", _)) => refresh(config, registry).await,
        _ => Ok(()),
    }
}

fn load_config(matches: &ArgMatches) -> marki18n::Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => Config::load(Path::new(path)),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

async fn run(
    config: Config,
    registry: ProviderRegistry,
    files: &[PathBuf],
    write: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        match std::fs::read_to_string(path) {
            Ok(source) => sources.push((path.clone(), source)),
            Err(e) => eprintln!("⚠️  Skipping {}: {}", path.display(), e),
        }
    }

    // 1. Mark and extract
    let outcomes = process_files(&sources, &config)?;
    let marked = outcomes.iter().filter(|o| o.rewritten.is_some()).count();
    println!(
        "🔍 {} files, {} marked, {} entries",
        outcomes.len(),
        marked,
        collect_entries(&outcomes).len()
    );

    if write {
        for outcome in &outcomes {
            if let Some(rewritten) = &outcome.rewritten {
                std::fs::write(&outcome.path, rewritten)?;
                println!("✏️  {}", outcome.normalized_path);
            }
        }
    }

    // 2. Reconcile, translating new keys when a provider is available
    let queue = if registry.is_empty() {
        ExtractQueue::new(config, FlushPolicy::Interactive)
    } else {
        let orchestrator = Arc::new(TranslationOrchestrator::new(config.clone(), registry)?);
        ExtractQueue::with_orchestrator(config, FlushPolicy::Interactive, orchestrator)
    };
    for outcome in outcomes {
        queue.add(outcome.entries);
    }
    queue.wait_for_all_operations().await;
    println!("✅ Dictionaries updated");
    Ok(())
}

async fn translate(
    config: Config,
    registry: ProviderRegistry,
) -> Result<(), Box<dyn std::error::Error>> {
    if registry.is_empty() {
        eprintln!("❌ No translation provider configured");
        eprintln!("   Set [translate].provider in the config file, or use --mock");
        return Err("No translation provider".into());
    }
    let orchestrator = TranslationOrchestrator::new(config, registry)?;
    let report = orchestrator.translate_project().await?;
    println!("🌍 Translated {} strings", report.translated_count());
    for (key, language) in &report.failed {
        println!("   ⚠️  {} → {} kept untranslated", key, language);
    }
    Ok(())
}

async fn refresh(
    config: Config,
    registry: ProviderRegistry,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = TranslationOrchestrator::new(config, registry)?;
    let languages = orchestrator.force_refresh_language_files().await?;
    if languages.is_empty() {
        println!("✅ Dictionaries already match the ledger");
    } else {
        println!("🔄 Regenerated: {}", languages.join(", "));
    }
    Ok(())
}
