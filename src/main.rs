use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use hostman::{AddOutcome, HostsUpdator, Platform, Registry, Source, purge_working_dir};

#[derive(Parser)]
#[command(name = "hostman")]
#[command(about = "Switch the system hosts file between named remote sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sources; the one in use is marked with "*"
    #[command(alias = "ls")]
    List,
    /// Add a source, or update an existing one after confirmation
    Add {
        /// Source name
        name: String,
        /// URL to download hosts content from
        url: String,
        /// Free-text note
        #[arg(long, default_value = "")]
        note: String,
        /// Overwrite an existing source without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Remove sources and their cached downloads
    #[command(alias = "rm")]
    Remove {
        /// Source names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Rename a source
    Rename {
        /// Existing name
        old: String,
        /// New name
        new: String,
    },
    /// Move a source to a new position ("3") or by a delta ("+1", "-2")
    Reorder {
        /// Source name
        name: String,
        /// Position token
        #[arg(allow_hyphen_values = true)]
        order: String,
    },
    /// Select the current source
    Use {
        /// Source name
        name: String,
    },
    /// Download a source's hosts content (defaults to the current source)
    Pull {
        /// Source name
        name: Option<String>,
    },
    /// Update the live hosts file from the current source (pull + apply)
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_accepts_negative_delta_token() {
        let cli = Cli::try_parse_from(["hostman", "reorder", "x", "-2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reorder { name, order } if name == "x" && order == "-2"
        ));
    }

    #[test]
    fn reorder_accepts_absolute_and_relative_tokens() {
        for token in ["1", "+1"] {
            let cli = Cli::try_parse_from(["hostman", "reorder", "x", token]).unwrap();
            assert!(matches!(cli.command, Commands::Reorder { order, .. } if order == token));
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "hostman=info".into()),
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Registry file path and app data root, per platform conventions.
fn app_paths() -> anyhow::Result<(PathBuf, PathBuf)> {
    let dirs = directories::ProjectDirs::from("", "", "hostman")
        .context("could not determine a home directory for this user")?;
    Ok((
        dirs.config_dir().join("registry.json"),
        dirs.data_dir().to_path_buf(),
    ))
}

fn find<'a>(registry: &'a Registry, name: Option<&str>) -> anyhow::Result<&'a Source> {
    match name {
        Some(n) => registry
            .sources
            .iter()
            .find(|s| s.name == n)
            .with_context(|| format!("unknown source: {n}")),
        None => registry
            .current_source()
            .context("no current source selected (run `hostman use <name>` first)"),
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y"))
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (registry_path, app_root) = app_paths()?;
    let mut registry = Registry::load(&registry_path)?;

    match cli.command {
        Commands::List => {
            for source in &registry.sources {
                let marker = if source.name == registry.current { "*" } else { " " };
                if source.note.is_empty() {
                    println!("{marker} {}\t{}", source.name, source.url);
                } else {
                    println!("{marker} {}\t{}\t# {}", source.name, source.url, source.note);
                }
            }
        }
        Commands::Add { name, url, note, yes } => {
            if registry.contains(&name)
                && !yes
                && !confirm(&format!("source {name:?} exists, overwrite?"))?
            {
                bail!("aborted, source {name:?} left unchanged");
            }
            match registry.add(Source::new(&name, &url, note)) {
                AddOutcome::Added => println!("added source: {name} - {url}"),
                AddOutcome::Updated => println!("updated source: {name} - {url}"),
            }
            registry.save(&registry_path)?;
        }
        Commands::Remove { names } => {
            for name in &names {
                if !registry.contains(name) {
                    bail!("unknown source: {name}");
                }
            }
            let removed = registry.remove(&names)?;
            registry.save(&registry_path)?;
            for source in removed {
                if let Err(e) = purge_working_dir(&app_root, &source.name) {
                    tracing::warn!(source = %source.name, error = %e, "Could not remove cache");
                }
                println!("removed source: {}", source.name);
            }
        }
        Commands::Rename { old, new } => {
            registry.rename(&old, &new)?;
            registry.save(&registry_path)?;
            println!("renamed {old:?} to {new:?}");
        }
        Commands::Reorder { name, order } => {
            let index = registry.reorder(&name, &order)?;
            registry.save(&registry_path)?;
            println!("moved {name} to position {}", index + 1);
        }
        Commands::Use { name } => {
            registry.set_current(&name)?;
            registry.save(&registry_path)?;
            println!("switched current source to {name:?}");
        }
        Commands::Pull { name } => {
            let source = find(&registry, name.as_deref())?;
            HostsUpdator::new(&source.name, &source.url, &app_root)?.pull()?;
        }
        Commands::Run => {
            let platform = Platform::detect()?;
            if !platform.is_elevated() {
                if cfg!(windows) {
                    bail!("updating the hosts file requires an administrator prompt");
                }
                bail!("updating the hosts file requires root, re-run with sudo");
            }
            let source = find(&registry, None)?;
            let updator = HostsUpdator::new(&source.name, &source.url, &app_root)?;
            updator.pull()?;
            updator.apply()?;
        }
    }
    Ok(())
}
