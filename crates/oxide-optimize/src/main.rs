//! oxide-optimize CLI
//!
//! Command-line tool for precompiling route tables.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_optimize::prelude::*;
use oxide_route_compiler::{CompilerOptions, RuntimeVersion};

/// Precompile route tables into directly loadable matcher literals.
#[derive(Parser)]
#[command(name = "oxide-optimize")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root that relative paths are resolved against.
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    /// Application-wide middleware, by catalog name (repeatable).
    #[arg(long = "use", value_name = "NAME", global = true)]
    middleware: Vec<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile routes and write the optimized router.
    Optimize {
        /// Route manifests, merged in order (routes.json or src/routes.json if omitted).
        entries: Vec<PathBuf>,

        /// Output file.
        #[arg(short, long)]
        outfile: Option<PathBuf>,

        /// Source file whose matcher construction is replaced.
        #[arg(long)]
        target: Option<PathBuf>,

        /// Assignment target of the matcher construction.
        #[arg(long, default_value = oxide_route_compiler::options::DEFAULT_CALL_SITE)]
        call_site: String,

        /// Installed matching runtime version.
        #[arg(long, env = "OXIDE_RUNTIME_VERSION")]
        runtime_version: Option<RuntimeVersion>,

        /// Oldest runtime able to load a prepared literal.
        #[arg(long, env = "OXIDE_MINIMUM_RUNTIME")]
        minimum_runtime: Option<RuntimeVersion>,

        /// Maximum capture groups per combined expression.
        #[arg(long, default_value_t = oxide_route_compiler::options::DEFAULT_GROUP_LIMIT)]
        group_limit: usize,
    },

    /// List routes with their chains and eligibility for the combined form.
    Routes {
        /// Route manifests, merged in order.
        entries: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Optimize {
            entries,
            outfile,
            target,
            call_site,
            runtime_version,
            minimum_runtime,
            group_limit,
        } => {
            let mut options = CompilerOptions::default()
                .with_group_limit(group_limit)
                .with_call_site(call_site);
            if let Some(minimum) = minimum_runtime {
                options = options.with_minimum_runtime(minimum);
            }
            let config = OptimizeConfig {
                root: cli.root,
                entries,
                outfile,
                target,
                middleware: cli.middleware,
                runtime: runtime_version.unwrap_or_else(RuntimeVersion::current),
                options,
            };
            let report = optimize(&config).await?;

            println!(
                "[{}] {} route(s) -> {}",
                report.strategy,
                report.routes,
                report.outfile.display()
            );
            for reason in &report.downgrades {
                println!("  fallback: {reason}");
            }
        }

        Commands::Routes { entries } => {
            let config = OptimizeConfig {
                root: cli.root,
                entries,
                middleware: cli.middleware,
                ..OptimizeConfig::default()
            };
            let source = load_source(&config).await?;
            let rows = describe_routes(&source)?;

            if rows.is_empty() {
                info!("No routes declared.");
            } else {
                println!("\nRoutes:");
                println!("{:-<60}", "");
                for row in &rows {
                    let mark = if row.ineligible.is_some() { " " } else { "X" };
                    println!(
                        " [{mark}] {:>3} {:<7} {:<30} {}",
                        row.index,
                        row.method.as_str(),
                        row.path,
                        row.chain
                    );
                    if let Some(reason) = &row.ineligible {
                        println!("        {reason}");
                    }
                }
                println!();
            }
        }
    }

    Ok(())
}
