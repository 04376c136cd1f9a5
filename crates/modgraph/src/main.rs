//! modgraph command-line tool

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use modgraph::{
    resolve, resolve_target, DescriptorSet, PlanFile, Platform, ResolvedPlan, TargetRequest,
    TargetType,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "modgraph")]
#[command(about = "Resolve module dependencies per target platform", long_about = None)]
#[command(version)]
struct Cli {
    /// Descriptor file (TOML, or JSON by extension)
    #[arg(short, long, global = true, default_value = "modules.toml")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one module
    Resolve {
        /// Module name
        module: String,
        /// Target platform (Windows, Mac, Linux, Android, IOS)
        #[arg(short, long)]
        platform: Platform,
        /// Configuration kind (game, editor, client, server, program)
        #[arg(short, long, default_value = "game")]
        config: TargetType,
        /// Write a checksummed plan file instead of printing
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve every module of a target
    Target {
        /// Target name
        target: String,
        /// Target platform
        #[arg(short, long)]
        platform: Platform,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve every module for every platform and configuration
    Check,
    /// List modules and targets
    List,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let set = load(&cli.file)?;

    match cli.command {
        Commands::Resolve {
            module,
            platform,
            config,
            out,
            json,
        } => {
            let request = TargetRequest::new(module, platform).with_configuration(config);
            let plan = resolve(&set, &request)
                .with_context(|| format!("Failed to resolve {} for {}", request.module, platform))?;

            if let Some(out) = out {
                let file = PlanFile::new(plan)?;
                file.to_file(&out)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                println!("Wrote plan for {} to {}", file.module, out.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
        Commands::Target {
            target,
            platform,
            json,
        } => {
            let plan = resolve_target(&set, &target, platform)
                .with_context(|| format!("Failed to resolve target {} for {}", target, platform))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!(
                    "Target {} ({}) on {}",
                    plan.target, plan.configuration, plan.platform
                );
                for module in &plan.modules {
                    print_plan(module);
                }
            }
        }
        Commands::Check => {
            let mut checked = 0;
            for module in set.module_names() {
                for platform in Platform::ALL {
                    for config in TargetType::ALL {
                        let request =
                            TargetRequest::new(module, platform).with_configuration(config);
                        resolve(&set, &request).with_context(|| {
                            format!("{} does not resolve for {} ({})", module, platform, config)
                        })?;
                        checked += 1;
                    }
                }
            }
            for target in set.targets() {
                for platform in Platform::ALL {
                    resolve_target(&set, &target.name, platform).with_context(|| {
                        format!("Target {} does not resolve for {}", target.name, platform)
                    })?;
                }
            }
            println!("{} module(s) OK ({} resolutions)", set.len(), checked);
        }
        Commands::List => {
            if set.is_empty() {
                bail!("No modules declared in {}", cli.file.display());
            }
            println!("Modules:");
            for module in set.modules() {
                let platforms: Vec<String> =
                    module.rules.keys().map(|selector| selector.to_string()).collect();
                if platforms.is_empty() {
                    println!("  {}", module.name);
                } else {
                    println!("  {} [{}]", module.name, platforms.join(", "));
                }
            }
            let targets: Vec<_> = set.targets().collect();
            if !targets.is_empty() {
                println!("Targets:");
                for target in targets {
                    println!(
                        "  {} ({}): {}",
                        target.name,
                        target.target_type,
                        target.modules.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<DescriptorSet> {
    DescriptorSet::from_file(path)
        .with_context(|| format!("Failed to load descriptors from {}", path.display()))
}

fn print_plan(plan: &ResolvedPlan) {
    println!(
        "{} on {} ({})",
        plan.module, plan.platform, plan.configuration
    );
    println!("  dependencies: {}", plan.dependencies.join(", "));
    if !plan.build_order.is_empty() {
        println!("  build order:  {}", plan.build_order.join(", "));
    }
    for path in &plan.include_paths {
        println!("  include:      {}", path);
    }
    for framework in &plan.frameworks {
        match &framework.archive {
            Some(archive) => println!("  framework:    {} ({})", framework.name, archive),
            None => println!("  framework:    {}", framework.name),
        }
    }
    for prop in &plan.receipt_properties {
        println!("  receipt:      {} = {}", prop.key, prop.value);
    }
}
