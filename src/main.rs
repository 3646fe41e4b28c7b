use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ethers::prelude::*;
use ethers::signers::LocalWallet;
use ethers::utils::format_ether;
use std::convert::TryFrom;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensei_ens::db::{self, remember_registration, RegistrationRecord, RegistrationRepository};
use sensei_ens::types::duration_for_years;
use sensei_ens::{
    normalize_label, suggest_names, Config, DomainRegistrar, EnsResolver, EthersRegistrar,
    NameResolver, RegistrationAttempt, RegistrationIntent,
};

#[derive(Parser)]
#[command(name = "sensei-ens", version, about = "Register and resolve .eth names for Sensei replicas")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check availability and price of a name
    Check {
        name: String,
        #[arg(long, default_value_t = 1)]
        years: u64,
    },
    /// Register a name (commit, wait, register)
    Register {
        name: String,
        #[arg(long, default_value_t = 1)]
        years: u64,
        /// Owner of the name; defaults to the signing wallet
        #[arg(long, value_parser = parse_address)]
        owner: Option<Address>,
        /// Don't set the name as the owner's primary name
        #[arg(long)]
        no_reverse_record: bool,
        /// Replica the name is registered for, kept in the history
        #[arg(long)]
        replica_id: Option<String>,
    },
    /// Resolve a name to an address
    Resolve { name: String },
    /// Find the primary name of an address
    Lookup {
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Show the avatar record of a name
    Avatar { name: String },
    /// Set the signing wallet's primary name
    SetPrimary { name: String },
    /// Suggest available names for a replica
    Suggest {
        base: String,
        /// Expertise tag, repeatable
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Show locally recorded registrations
    History {
        #[arg(long, value_parser = parse_address)]
        owner: Option<Address>,
        #[arg(long)]
        replica_id: Option<String>,
    },
}

fn parse_address(input: &str) -> Result<Address, String> {
    input
        .parse::<Address>()
        .map_err(|e| format!("invalid address {}: {}", input, e))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sensei_ens=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing();

    tracing::debug!(network = %config.network, rpc = %config.rpc_url, "Loaded configuration");

    match cli.command {
        Command::Check { name, years } => check(&config, &name, years, cli.json).await,
        Command::Register {
            name,
            years,
            owner,
            no_reverse_record,
            replica_id,
        } => {
            register(
                &config,
                &name,
                years,
                owner,
                !no_reverse_record,
                replica_id,
                cli.json,
            )
            .await
        }
        Command::Resolve { name } => resolve(&config, &name, cli.json).await,
        Command::Lookup { address } => lookup(&config, address, cli.json).await,
        Command::Avatar { name } => avatar(&config, &name, cli.json).await,
        Command::SetPrimary { name } => set_primary(&config, &name, cli.json).await,
        Command::Suggest { base, skills } => suggest(&config, &base, &skills, cli.json).await,
        Command::History { owner, replica_id } => history(&config, owner, replica_id, cli.json).await,
    }
}

fn provider(config: &Config) -> anyhow::Result<Provider<Http>> {
    Provider::<Http>::try_from(config.rpc_url.as_str())
        .with_context(|| format!("invalid RPC_URL {}", config.rpc_url))
}

fn signer(config: &Config) -> anyhow::Result<SignerMiddleware<Provider<Http>, LocalWallet>> {
    let wallet: LocalWallet = config
        .require_private_key()?
        .parse::<LocalWallet>()?
        .with_chain_id(config.network.chain_id());
    Ok(SignerMiddleware::new(provider(config)?, wallet))
}

fn registrar<M: Middleware + 'static>(
    client: Arc<M>,
    config: &Config,
) -> anyhow::Result<DomainRegistrar<EthersRegistrar<M>>> {
    let contracts = config.network.contracts()?;
    let ethers_registrar =
        EthersRegistrar::new(client, &contracts).with_confirmations(config.confirmations);
    Ok(DomainRegistrar::new(ethers_registrar).with_retry(config.retry))
}

fn resolver<M: Middleware + 'static>(client: Arc<M>, config: &Config) -> anyhow::Result<EnsResolver<M>> {
    let contracts = config.network.contracts()?;
    Ok(EnsResolver::new(client, &contracts).with_retry(config.retry))
}

async fn repository(config: &Config) -> anyhow::Result<Option<RegistrationRepository>> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(None);
    };
    let pool = db::create_pool(url).await?;
    db::run_migrations(&pool).await?;
    Ok(Some(RegistrationRepository::new(pool)))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn check(config: &Config, name: &str, years: u64, json: bool) -> anyhow::Result<()> {
    let label = normalize_label(name)?;
    let registrar = registrar(Arc::new(provider(config)?), config)?;

    let available = registrar.is_available(&label).await?;
    let price = registrar.rent_price(&label, duration_for_years(years)?).await?;

    if json {
        return print_json(&serde_json::json!({
            "name": format!("{}.eth", label),
            "available": available,
            "years": years,
            "base_wei": price.base.to_string(),
            "premium_wei": price.premium.to_string(),
            "total_wei": price.total().to_string(),
        }));
    }

    if available {
        println!("✅ {}.eth is available", label);
    } else {
        println!("❌ {}.eth is already taken", label);
    }
    println!(
        "   Price for {} year(s): {} ETH (premium {} ETH)",
        years,
        format_ether(price.total()),
        format_ether(price.premium)
    );
    Ok(())
}

async fn register(
    config: &Config,
    name: &str,
    years: u64,
    owner: Option<Address>,
    reverse_record: bool,
    replica_id: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let label = normalize_label(name)?;
    let client = Arc::new(signer(config)?);
    let contracts = config.network.contracts()?;
    let owner = owner.unwrap_or_else(|| client.address());

    let intent = RegistrationIntent::new(label, owner, contracts.public_resolver)
        .with_duration(duration_for_years(years)?)
        .with_reverse_record(reverse_record);
    let duration = intent.duration;

    // Open history before paying, so a bad DATABASE_URL fails nothing on chain.
    let history = repository(config).await?;

    let registrar = registrar(client.clone(), config)?;
    let mut attempt = RegistrationAttempt::new(&registrar, intent);

    tracing::info!(name = %attempt.intent().full_name(), ?owner, network = %config.network, "Starting registration");
    let receipt = attempt.run().await?;

    let resolver = resolver(client, config)?;
    match attempt.verify(&resolver).await {
        Ok(true) => tracing::info!(name = %receipt.name, "Name resolves to its owner"),
        Ok(false) => tracing::warn!(name = %receipt.name, "Name does not resolve to its owner yet"),
        Err(e) => tracing::warn!(name = %receipt.name, error = %e, "Could not verify registration"),
    }

    let replica_id = replica_id.unwrap_or_else(|| format!("{:?}", owner));
    remember_registration(history.as_ref(), &replica_id, &receipt, duration).await;

    if json {
        return print_json(&receipt);
    }
    println!("🎉 Registered {}", receipt.name);
    println!("   Owner: {:?}", receipt.owner);
    println!("   Tx: {:?}", receipt.transaction_hash);
    println!(
        "   Paid: {} ETH (sent {} ETH, excess refunded)",
        format_ether(receipt.price),
        format_ether(receipt.value_sent)
    );
    Ok(())
}

async fn resolve(config: &Config, name: &str, json: bool) -> anyhow::Result<()> {
    let resolver = resolver(Arc::new(provider(config)?), config)?;
    let address = resolver.resolve_address(name).await?;

    if json {
        return print_json(&serde_json::json!({ "name": name, "address": address }));
    }
    match address {
        Some(address) => println!("{} -> {:?}", name, address),
        None => println!("{} does not resolve to an address", name),
    }
    Ok(())
}

async fn lookup(config: &Config, address: Address, json: bool) -> anyhow::Result<()> {
    let resolver = resolver(Arc::new(provider(config)?), config)?;
    let name = resolver.resolve_primary_name(address).await?;

    if json {
        return print_json(&serde_json::json!({ "address": address, "name": name }));
    }
    match name {
        Some(name) => println!("{:?} -> {}", address, name),
        None => println!("{:?} has no primary name", address),
    }
    Ok(())
}

async fn avatar(config: &Config, name: &str, json: bool) -> anyhow::Result<()> {
    let resolver = resolver(Arc::new(provider(config)?), config)?;
    let avatar = resolver.resolve_avatar(name).await?;

    if json {
        return print_json(&serde_json::json!({ "name": name, "avatar": avatar }));
    }
    match avatar {
        Some(uri) => println!("{} avatar: {}", name, uri),
        None => println!("{} has no avatar", name),
    }
    Ok(())
}

async fn set_primary(config: &Config, name: &str, json: bool) -> anyhow::Result<()> {
    let client = Arc::new(signer(config)?);
    let registrar = registrar(client, config)?;
    let tx = registrar.set_primary_name(name).await?;

    if json {
        return print_json(&serde_json::json!({ "name": name, "transaction_hash": tx }));
    }
    println!("✅ Primary name set to {} (tx {:?})", name, tx);
    Ok(())
}

async fn suggest(config: &Config, base: &str, skills: &[String], json: bool) -> anyhow::Result<()> {
    let suggestions = suggest_names(base, skills);
    if suggestions.is_empty() {
        bail!("no valid names can be built from {:?}", base);
    }

    let registrar = registrar(Arc::new(provider(config)?), config)?;
    let checks = futures::future::join_all(
        suggestions
            .iter()
            .map(|label| registrar.is_available(label)),
    )
    .await;

    let mut rows = Vec::with_capacity(suggestions.len());
    for (label, check) in suggestions.iter().zip(checks) {
        let available = match check {
            Ok(available) => Some(available),
            Err(e) => {
                tracing::warn!(%label, error = %e, "Availability unknown");
                None
            }
        };
        rows.push((format!("{}.eth", label), available));
    }

    if json {
        let rows: Vec<_> = rows
            .iter()
            .map(|(name, available)| serde_json::json!({ "name": name, "available": available }))
            .collect();
        return print_json(&rows);
    }
    for (name, available) in rows {
        let status = match available {
            Some(true) => "available",
            Some(false) => "taken",
            None => "unknown",
        };
        println!("{:<30} {}", name, status);
    }
    Ok(())
}

async fn history(
    config: &Config,
    owner: Option<Address>,
    replica_id: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let repo = repository(config)
        .await?
        .ok_or_else(|| anyhow!("DATABASE_URL is not set; no registration history"))?;
    repo.mark_expired(Utc::now()).await?;

    let records: Vec<RegistrationRecord> = match (owner, replica_id) {
        (Some(owner), _) => repo.list_by_owner(owner).await?,
        (None, Some(replica_id)) => repo.find_by_replica(&replica_id).await?,
        (None, None) => repo.list_all().await?,
    };

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No registrations recorded");
    }
    for record in records {
        println!(
            "{:<30} {:<10} owner {} expires {}",
            record.name,
            record.status,
            record.owner,
            record.expires_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
