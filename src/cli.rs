//! CLI definitions and command routing.

use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::hosts::{Entry, HostsFile};

#[derive(Parser)]
#[command(name = "etchosts", version)]
#[command(about = "Add and remove host entries in the /etc/hosts file")]
pub struct Cli {
    /// Hosts file path (default /etc/hosts, or ETCHOSTS_FILE)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a host entry; domains go to the existing line if the IP is known
    Add(AddArgs),
    /// Remove a host mapping by IP, or a single domain with --domain
    Remove(RemoveArgs),
    /// List all mappings (IP, then its domains)
    List,
}

#[derive(Args)]
pub struct AddArgs {
    /// IP address of the entry
    #[arg(short, long)]
    pub ip: String,

    /// Domains to map (repeat the flag or separate with commas)
    #[arg(short, long, required = true, num_args = 1.., value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Comment line written above a new entry
    #[arg(short, long)]
    pub comment: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// IP of the mapping, or a domain when --domain is set
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub id: String,

    /// Treat ID as a domain and remove only that domain
    #[arg(short, long)]
    pub domain: bool,
}

/// Run CLI and dispatch to handlers.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);
    let config = Config::resolve(cli.file);

    match cli.command {
        Commands::Add(args) => cmd_add(&config, args),
        Commands::Remove(args) => cmd_remove(&config, args),
        Commands::List => cmd_list(&config),
    }
}

fn load(config: &Config) -> Result<HostsFile> {
    HostsFile::load(config.hosts_file()).context("Unable to initialize parser")
}

fn cmd_add(config: &Config, args: AddArgs) -> Result<()> {
    let mut hosts = load(config)?;
    let mut entry = Entry::new(args.ip, args.domains);
    if let Some(comment) = args.comment {
        entry = entry.with_comment(comment);
    }
    let line = entry.mapping_line();
    hosts
        .add_mapping(entry)
        .context("Unable to add host mapping")?;
    println!("Added: {line}");
    Ok(())
}

fn cmd_remove(config: &Config, args: RemoveArgs) -> Result<()> {
    let mut hosts = load(config)?;
    if args.domain {
        hosts
            .remove_domain(&args.id)
            .with_context(|| format!("Unable to remove domain {}", args.id))?;
        println!("Removed domain: {}", args.id);
    } else {
        let removed = hosts
            .remove_mapping(&args.id)
            .with_context(|| format!("Unable to remove host mapping {}", args.id))?;
        if removed {
            println!("Removed mapping: {}", args.id);
        } else {
            println!("No mapping for {}", args.id);
        }
    }
    Ok(())
}

fn cmd_list(config: &Config) -> Result<()> {
    let hosts = load(config)?;
    for (ip, domains) in hosts.index() {
        println!("{ip}\t{}", domains.join(" "));
    }
    Ok(())
}
