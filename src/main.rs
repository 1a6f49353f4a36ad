// Entry point for the hashlink-chain CLI
// Every command builds one node from the configuration, does its work, and persists
// the keystore; the chain itself is persisted by the node through its snapshot.
use clap::Parser;
use hashlink_chain::core::monetary::conversions::format_balance;
use hashlink_chain::{
    validate_address, Command, Config, EcdsaP256Scheme, Node, NodeRegistry, Opt, Wallets,
};
use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

// The chain lives here when the configuration names no snapshot
const DEFAULT_SNAPSHOT: &str = "chain.json";

fn main() {
    // Info by default; RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> hashlink_chain::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if config.snapshot_path.is_none() {
        config.snapshot_path = Some(PathBuf::from(DEFAULT_SNAPSHOT));
    }
    Ok(config)
}

fn open_node(config: Config, wallet_file: &Path) -> hashlink_chain::Result<Node> {
    let wallets = Wallets::load_from_file(wallet_file)?;
    Node::with_parts("local", config, wallets, Arc::new(EcdsaP256Scheme))
}

fn save_wallets(node: &Node, wallet_file: &Path) -> hashlink_chain::Result<()> {
    let wallets = node.wallets();
    let wallets = wallets
        .lock()
        .map_err(|_| hashlink_chain::BlockchainError::LockPoisoned("keystore".to_string()))?;
    wallets.save_to_file(wallet_file)
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let wallet_file = opt.wallet_file.as_path();
    match opt.command {
        Command::Createwallet => {
            let mut wallets = Wallets::load_from_file(wallet_file)?;
            let address = wallets.create_wallet()?;
            wallets.save_to_file(wallet_file)?;
            println!("Your new address: {address}")
        }
        Command::ListAddresses => {
            let wallets = Wallets::load_from_file(wallet_file)?;
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::GetBalance { address } => {
            let node = open_node(load_config(opt.config.as_deref())?, wallet_file)?;
            let balance = node.balance(&address)?;
            println!("Balance of {address}: {}", format_balance(balance));
        }
        Command::Send {
            from,
            to,
            amount,
            fee,
            note,
            miner,
        } => {
            // Wallet addresses are checksummed; anything else is a typo
            for address in [&from, &to] {
                if !validate_address(address) {
                    return Err(format!("Invalid address: {address}").into());
                }
            }
            let node = open_node(load_config(opt.config.as_deref())?, wallet_file)?;
            let txid = node.submit_transaction(&from, &to, amount, fee, &note)?;
            info!("Transaction {txid} admitted");

            // The mempool is not persisted, so the transfer is mined right away
            let miner = miner.unwrap_or_else(|| from.clone());
            let block = node.mine_sync(&miner)?;
            save_wallets(&node, wallet_file)?;
            println!("Success! Transaction {txid} included in block {}", block.get_hash());
        }
        Command::Mine { miner } => {
            let node = open_node(load_config(opt.config.as_deref())?, wallet_file)?;
            let block = node.mine_sync(&miner)?;
            println!(
                "Mined block {} at height {} (nonce {}, difficulty {})",
                block.get_hash(),
                block.get_height(),
                block.get_nonce(),
                block.get_difficulty()
            );
        }
        Command::Printchain => {
            let node = open_node(load_config(opt.config.as_deref())?, wallet_file)?;
            let chain = node.chain()?;
            println!("{}", serde_json::to_string_pretty(&chain)?);
        }
        Command::Validate => {
            let node = open_node(load_config(opt.config.as_deref())?, wallet_file)?;
            if node.is_chain_valid()? {
                println!("Chain of {} blocks is valid", node.height()? + 1);
            } else {
                return Err("Chain failed validation".into());
            }
        }
        Command::Simulate { blocks } => simulate(opt.config.as_deref(), blocks)?,
    }
    Ok(())
}

// Three in-process nodes sharing one genesis; A mines and broadcasts, B and C validate
fn simulate(config_path: Option<&Path>, blocks: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    config.snapshot_path = None;

    let mut wallets = Wallets::new();
    let sender = wallets.create_wallet()?;
    let receiver = wallets.create_wallet()?;
    config
        .genesis_allocations
        .push(hashlink_chain::GenesisAllocation {
            address: sender.clone(),
            amount: 10 * hashlink_chain::core::SATOSHIS_PER_COIN,
        });

    let mut registry = NodeRegistry::new();
    registry.register(Node::with_parts(
        "A",
        config.clone(),
        wallets,
        Arc::new(EcdsaP256Scheme),
    )?);
    for id in ["B", "C"] {
        registry.register(Node::new(id, config.clone())?);
    }

    let producer = registry.get("A")?;
    for round in 1..=blocks {
        producer.submit_transaction(
            &sender,
            &receiver,
            hashlink_chain::core::SATOSHIS_PER_COIN / 10,
            hashlink_chain::core::DEFAULT_TRANSACTION_FEE,
            &format!("round {round}"),
        )?;
        let block = producer.mine_sync(&sender)?;
        println!("A mined block {} at height {}", block.get_hash(), block.get_height());

        for (peer, accepted) in registry.broadcast_last_block("A")? {
            println!("  {peer}: {}", if accepted { "accepted" } else { "rejected" });
        }
    }

    for id in registry.node_ids() {
        let node = registry.get(&id)?;
        println!(
            "{id}: height {}, receiver balance {}",
            node.height()?,
            format_balance(node.balance(&receiver)?)
        );
    }
    Ok(())
}
