use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use omni_config::ConfigLoader;
use omni_delivery::{create_sign_and_send, implementations::RpcSignerFactory};
use omni_service::{AutoConfirm, Prompt, SignAndSendFlow, TerminalPrompt};
use omni_types::{format::format_eid, format::pluralize, OmniTransaction, SharedTransaction};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "omni-devtools")]
#[command(about = "Signs and submits omnichain transactions", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", env = "OMNI_CONFIG", default_value = "omni.toml")]
	config: PathBuf,

	#[arg(long, env = "OMNI_LOG_LEVEL", default_value = "info")]
	log_level: String,

	/// Emit logs as JSON lines
	#[arg(long)]
	json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Sign and submit the transactions in a JSON file
	Submit {
		#[arg(short, long, value_name = "FILE")]
		transactions: PathBuf,

		/// Never prompt, submit everything once
		#[arg(long)]
		ci: bool,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level, cli.json_logs)?;

	match &cli.command {
		Commands::Submit { transactions, ci } => submit(&cli, transactions, *ci).await,
		Commands::Validate => validate_config(&cli),
	}
}

async fn submit(cli: &Cli, transactions_path: &Path, ci: bool) -> Result<()> {
	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.context("Failed to load configuration")?;

	let transactions = load_transactions(transactions_path)?;
	if transactions.is_empty() {
		info!("No transactions to submit");
		return Ok(());
	}

	let factory = RpcSignerFactory::new(config.networks.clone());
	for transaction in &transactions {
		if !factory.supports(transaction.point.eid) {
			warn!(
				"No network configured for {}, its transactions will fail",
				format_eid(transaction.point.eid)
			);
		}
	}

	let prompt: Arc<dyn Prompt> = if ci {
		Arc::new(AutoConfirm)
	} else {
		Arc::new(TerminalPrompt)
	};
	let flow = SignAndSendFlow::new(
		create_sign_and_send(Arc::new(factory), config.submission.clone()),
		prompt,
	);

	let result = flow
		.run(&transactions)
		.await
		.context("Failed to sign and send transactions")?;

	info!(
		"Sent {}, {} failed, {} pending",
		pluralize(result.succeeded.len(), "transaction"),
		result.failed.len(),
		result.pending.len()
	);

	if !result.failed.is_empty() {
		bail!(
			"Failed to send {}",
			pluralize(result.failed.len(), "transaction")
		);
	}

	Ok(())
}

fn load_transactions(path: &Path) -> Result<Vec<SharedTransaction>> {
	let contents = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read transactions from {:?}", path))?;
	let transactions: Vec<OmniTransaction> = serde_json::from_str(&contents)
		.with_context(|| format!("Failed to parse transactions from {:?}", path))?;

	Ok(transactions.into_iter().map(Arc::new).collect())
}

fn validate_config(cli: &Cli) -> Result<()> {
	info!("Validating configuration file: {:?}", cli.config);

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.context("Failed to load configuration")?;

	info!("Configuration is valid");
	info!(
		"Submission: batched wait {}, batched send {}, batch size {}",
		config.submission.batched_wait,
		config.submission.batched_send,
		config
			.submission
			.batch_size
			.map(|size| size.to_string())
			.unwrap_or_else(|| "unlimited".to_string())
	);

	let mut eids: Vec<_> = config.networks.keys().copied().collect();
	eids.sort();
	info!("Networks:");
	for eid in eids {
		let network = &config.networks[&eid];
		info!(
			"  {}: {} (from {}, {} confirmations)",
			network.name.clone().unwrap_or_else(|| format_eid(eid)),
			network.rpc_url,
			network.from,
			network.confirmations
		);
	}

	Ok(())
}

fn setup_tracing(log_level: &str, json: bool) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	let registry = tracing_subscriber::registry().with(env_filter);
	let initialized = if json {
		registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()
	} else {
		registry.with(tracing_subscriber::fmt::layer()).try_init()
	};

	initialized.context("Failed to initialize logging")
}
