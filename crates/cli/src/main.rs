use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ferro_core::{IntentResolver, RuleTable};
use ferro_ml::load_fallback_from_env;
use ferro_observability::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "ferro")]
#[command(about = "FerroAI intent resolver CLI")]
struct Cli {
    /// Never call the external classifier, even when a key is configured.
    #[arg(long, env = "FERRO_NO_FALLBACK")]
    no_fallback: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one query and print the intent as JSON.
    Resolve {
        query: String,
        #[arg(long)]
        pretty: bool,
    },
    /// Interactive loop, one query per line.
    Chat,
    /// List the local rules in evaluation order.
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("ferro_cli");
    let cli = Cli::parse();

    let resolver = build_resolver(cli.no_fallback)?;

    match cli.command {
        Command::Resolve { query, pretty } => {
            anyhow::ensure!(!query.is_empty(), "query must be at least 1 character");
            let response = resolver.resolve(&query).await;
            let rendered = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{rendered}");
        }
        Command::Chat => run_chat(resolver).await?,
        Command::Rules => {
            for (position, rule) in resolver.rules().rules().iter().enumerate() {
                println!(
                    "{:>2}. {:<12} {}  {}",
                    position + 1,
                    rule.category.as_code(),
                    rule.language.as_code(),
                    rule.pattern()
                );
            }
        }
    }

    Ok(())
}

async fn run_chat(resolver: IntentResolver) -> Result<()> {
    println!("FerroAI intent chat. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let resolution = resolver.resolve_detailed(message).await;
        println!(
            "[{} via {}] {}",
            resolution.response.action.as_code(),
            resolution.source.as_code(),
            serde_json::to_string(&resolution.response)?
        );
        if let Some(say) = resolution.response.say.as_deref() {
            println!("{say}");
        }
        println!();
    }

    Ok(())
}

fn build_resolver(no_fallback: bool) -> Result<IntentResolver> {
    let rules = Arc::new(RuleTable::try_standard().context("invalid built-in rule table")?);
    let fallback = if no_fallback {
        None
    } else {
        load_fallback_from_env()?
    };

    Ok(IntentResolver::new(rules, fallback))
}
