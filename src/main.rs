use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use pootle_upgrade::{
    BuildVersion, CURRENT_BUILD_VERSION, FileVersionStore, InMemoryRepository, MemoryCache,
    UPGRADE_ACTIONS, UpgradeConfig, UpgradeContext, pootle_version, upgrade, upgrade_functions,
};
use pootle_upgrade::upgrade::find_action;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pootle-upgrade")]
#[command(about = "Run post-upgrade data actions for a Pootle installation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every action between the stored build version and the target
    Run {
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        versions: Option<PathBuf>,
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Build version to upgrade from, instead of the stored one
        #[arg(long)]
        from: Option<BuildVersion>,
        #[arg(long)]
        to: Option<BuildVersion>,
        /// Fail when an action could not migrate some records
        #[arg(long)]
        strict: bool,
    },
    /// List the actions a run would execute
    Plan {
        #[arg(long)]
        from: BuildVersion,
        #[arg(long)]
        to: Option<BuildVersion>,
    },
    /// Describe the action registered for a build version
    Show { version: BuildVersion },
    /// Print the stored build version
    Version {
        #[arg(long)]
        versions: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = UpgradeConfig::from_env().context("Invalid POOTLE_UPGRADE_* environment")?;

    match cli.command {
        Command::Run {
            data,
            versions,
            cache,
            from,
            to,
            strict,
        } => {
            let strict = strict || config.abort_on_item_failure;
            let mut config = config.abort_on_item_failure(strict);
            if let Some(data) = data {
                config = config.data_path(data);
            }
            if let Some(versions) = versions {
                config = config.versions_path(versions);
            }
            if let Some(cache) = cache {
                config = config.cache_path(cache);
            }
            if let Some(to) = to {
                config = config.target_version(to);
            }
            run(&config, from)
        }
        Command::Plan { from, to } => plan(from, to.unwrap_or(config.target_version)),
        Command::Show { version } => {
            let action = find_action(version).ok_or_else(|| {
                anyhow!("No upgrade action is registered for build version {}", version)
            })?;
            println!("{}  {:<18} {}", action.version, action.name, action.description);
            Ok(())
        }
        Command::Version { versions } => {
            let path = versions.unwrap_or(config.versions_path);
            match pootle_version(&FileVersionStore::new(&path))? {
                Some(version) => println!("{}", version),
                None => println!("no build version stored in '{}'", path.display()),
            }
            Ok(())
        }
    }
}

fn run(config: &UpgradeConfig, from: Option<BuildVersion>) -> Result<()> {
    let repo = InMemoryRepository::load(&config.data_path)
        .with_context(|| format!("Failed to load '{}'", config.data_path.display()))?;
    let cache = match &config.cache_path {
        Some(path) => MemoryCache::load(path, config.cache_capacity)
            .with_context(|| format!("Failed to load cache '{}'", path.display()))?,
        None => MemoryCache::new(config.cache_capacity)?,
    };
    let versions = FileVersionStore::new(&config.versions_path);

    let old = match from {
        Some(version) => version,
        None => pootle_version(&versions)?.ok_or_else(|| {
            anyhow!(
                "No build version stored in '{}'; pass --from",
                config.versions_path.display()
            )
        })?,
    };

    let ctx = UpgradeContext::new(&repo, &repo, &cache, &versions)
        .abort_on_item_failure(config.abort_on_item_failure);
    let outcome = upgrade(&ctx, old, config.target_version);

    // Records touched before a failure stay migrated, so persist them either way.
    repo.save(&config.data_path)
        .with_context(|| format!("Failed to save '{}'", config.data_path.display()))?;
    if let Some(path) = &config.cache_path {
        cache
            .dump(path)
            .with_context(|| format!("Failed to save cache '{}'", path.display()))?;
    }

    let report = outcome.context("Upgrade aborted")?;
    print!("{}", report);
    Ok(())
}

fn plan(from: BuildVersion, to: BuildVersion) -> Result<()> {
    let selected = upgrade_functions(from, to)?;
    if selected.is_empty() {
        println!("Nothing to do between {} and {}", from, to);
        return Ok(());
    }
    for action in selected {
        println!("{}  {:<18} {}", action.version, action.name, action.description);
    }
    if to > CURRENT_BUILD_VERSION {
        println!(
            "note: target {} is newer than this build ({}); last known action is {}",
            to,
            CURRENT_BUILD_VERSION,
            UPGRADE_ACTIONS.last().map(|a| a.name).unwrap_or("none")
        );
    }
    Ok(())
}
