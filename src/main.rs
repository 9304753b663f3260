// Use modules from the library crate
use stitch::{DEFAULT_STAGING_DIR, commands, compose, config, logging, types};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use std::path::PathBuf;
use types::OutputFormat;

#[derive(Parser)]
#[command(
    name = "stitch",
    about = "Assemble a deployable stack from reusable compose fragments",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Component selection shared by `assemble` and `graph`
#[derive(Args, Debug)]
struct StackArgs {
    /// Root component (path, alias, or name in a search path)
    ///
    /// Components can be specified as:
    ///   ./stack/app        - Directory with component.yaml or compose.yaml
    ///   base.yaml          - A single fragment file
    ///   db                 - Alias from the config, then the search paths
    root: String,

    /// Extra component attached to the root (repeatable)
    #[arg(long = "extra", short = 'e', value_name = "SPEC")]
    extras: Vec<String>,

    /// Activate a profile (repeatable; overrides STITCH_PROFILES)
    #[arg(long = "profile", short = 'p', value_name = "PROFILE")]
    profiles: Vec<String>,

    /// Additional directory searched for components by name (repeatable)
    #[arg(long = "search-path", short = 's', value_name = "DIR")]
    search_paths: Vec<PathBuf>,
}

impl StackArgs {
    fn into_options(self, modifications: Vec<String>) -> commands::ResolveOptions {
        let env_profiles = std::env::var(compose::PROFILES_ENV).ok();
        commands::ResolveOptions {
            root: self.root,
            extras: self.extras,
            profiles: compose::active_profiles(&self.profiles, env_profiles.as_deref()),
            modifications,
            search_paths: self.search_paths,
        }
    }
}

#[derive(Parser)]
enum Command {
    /// Resolve a stack and stage its fragments
    ///
    /// Writes one fragment per resolved component plus a compose.yaml that
    /// includes them in startup order.
    ///
    /// Examples:
    ///   stitch assemble ./stack/app
    ///   stitch assemble ./stack/app -e metrics -p full
    ///   stitch assemble app -m db=./patches/db.yaml -o build/stack --force
    Assemble {
        #[command(flatten)]
        stack: StackArgs,

        /// Patch another component: TARGET=PATCH.yaml (repeatable)
        #[arg(long = "modify", short = 'm', value_name = "TARGET=PATCH")]
        modifications: Vec<String>,

        /// Staging directory
        #[arg(long, short = 'o', default_value = DEFAULT_STAGING_DIR)]
        output: PathBuf,

        /// Reuse a non-empty staging directory; previously staged fragments are replaced
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved startup order without writing anything
    Graph {
        #[command(flatten)]
        stack: StackArgs,

        /// Patch another component: TARGET=PATCH.yaml (repeatable)
        #[arg(long = "modify", short = 'm', value_name = "TARGET=PATCH")]
        modifications: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Registry management commands for component aliases
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

#[derive(Parser)]
enum RegistryCommand {
    /// Manage component aliases
    Component {
        #[command(subcommand)]
        command: ComponentCommand,
    },

    /// Show registry information and component aliases
    Info,
}

#[derive(Parser)]
enum ComponentCommand {
    /// Register a component alias
    ///
    /// Aliases can reference:
    /// - Local paths: ./stack/postgres (stored as an absolute path)
    /// - Other aliases or search path names (resolved recursively)
    ///
    /// Examples:
    ///   stitch registry component add db ./stack/postgres
    ///   stitch registry component add store db
    Add {
        /// Alias name (e.g., "db", "metrics")
        alias: String,

        /// Component spec (path or another alias)
        spec: String,
    },

    /// Unregister a component alias
    Remove {
        /// Alias name to remove
        alias: String,
    },

    /// List registered component aliases
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)?;

    match cli.command {
        Command::Assemble {
            stack,
            modifications,
            output,
            force,
        } => {
            let cfg = config::load_config().context("Failed to load config")?;
            let options = commands::assemble::AssembleOptions {
                resolve: stack.into_options(modifications),
                output_dir: output,
                force,
            };
            commands::assemble::run(cfg, options)
        }

        Command::Graph {
            stack,
            modifications,
            format,
        } => {
            let cfg = config::load_config().context("Failed to load config")?;
            commands::graph::run(cfg, &stack.into_options(modifications), format)
        }

        Command::Registry { command } => match command {
            RegistryCommand::Component { command } => match command {
                ComponentCommand::Add { alias, spec } => {
                    config::register_component(&alias, &spec)
                        .context("Failed to register component")?;

                    println!("✅ Registered alias: {} → {}", alias, spec);
                    Ok(())
                }

                ComponentCommand::Remove { alias } => {
                    config::unregister_component(&alias)
                        .context("Failed to unregister component")?;

                    println!("✅ Unregistered alias: {}", alias);
                    Ok(())
                }

                ComponentCommand::List => {
                    let cfg = config::load_config().context("Failed to load config")?;

                    print_components_list(&cfg);

                    Ok(())
                }
            },

            RegistryCommand::Info => {
                let stitch_dir = config::get_stitch_dir()?;
                let config_path = config::get_config_path()?;

                println!("stitch Registry Information");
                println!();
                println!("Config file:     {}", config_path.display());
                println!("Root directory:  {}", stitch_dir.display());
                if let Ok(log_dir) = config::get_log_dir() {
                    println!("Log directory:   {}", log_dir.display());
                }

                let cfg = config::load_config().context("Failed to load config")?;

                println!();
                println!("Statistics:");
                println!("  Components:   {}", cfg.components.len());
                println!("  Search paths: {}", cfg.search_paths.len());
                println!("  Concat keys:  {}", cfg.merge.concat_keys.join(", "));

                if !cfg.search_paths.is_empty() {
                    println!();
                    println!("Search paths:");
                    for path in &cfg.search_paths {
                        println!("  {}", path);
                    }
                }

                println!();
                print_components_list(&cfg);

                Ok(())
            }
        },
    }
}

/// Print components list or empty state message
fn print_components_list(cfg: &config::StitchConfig) {
    if cfg.components.is_empty() {
        println!("No components registered.");
        println!("\nTo register components, use:");
        println!("  # From a local directory:");
        println!("  stitch registry component add db ./stack/postgres");
        println!();
        println!("  # From another alias:");
        println!("  stitch registry component add store db");
    } else {
        println!("Components:");
        for (alias, spec) in &cfg.components {
            println!("  {} → {}", alias, spec);
        }
    }
}
