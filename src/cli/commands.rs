use crate::core::DEFAULT_TRANSACTION_FEE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hashlink-chain")]
pub struct Opt {
    #[arg(
        long = "config",
        global = true,
        help = "TOML configuration file (defaults to $CHAIN_CONFIG or built-in settings)"
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "wallet-file",
        global = true,
        default_value = crate::wallet::WALLET_FILE,
        help = "Keystore file"
    )]
    pub wallet_file: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(
        name = "getbalance",
        about = "Get the confirmed balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(name = "send", about = "Send a transfer and mine it into a block")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination wallet address")]
        to: String,
        #[arg(help = "Amount to send (in base units)")]
        amount: u64,
        #[arg(long = "fee", default_value_t = DEFAULT_TRANSACTION_FEE, help = "Fee (in base units)")]
        fee: u64,
        #[arg(long = "note", default_value = "", help = "Free-text note")]
        note: String,
        #[arg(long = "miner", help = "Reward address for the block (defaults to the sender)")]
        miner: Option<String>,
    },
    #[command(name = "mine", about = "Mine one block")]
    Mine {
        #[arg(help = "Reward address")]
        miner: String,
    },
    #[command(name = "printchain", about = "Print all blocks in the blockchain")]
    Printchain,
    #[command(name = "validate", about = "Audit hashes, links, proofs and signatures")]
    Validate,
    #[command(
        name = "simulate",
        about = "Mine on one of three in-process nodes and broadcast to the others"
    )]
    Simulate {
        #[arg(long = "blocks", default_value_t = 1, help = "Blocks to mine and broadcast")]
        blocks: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_defaults() {
        let opt = Opt::try_parse_from(["hashlink-chain", "send", "alice", "bob", "10"]).unwrap();
        match opt.command {
            Command::Send {
                amount, fee, miner, ..
            } => {
                assert_eq!(amount, 10);
                assert_eq!(fee, DEFAULT_TRANSACTION_FEE);
                assert_eq!(miner, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(opt.wallet_file, PathBuf::from("wallet.dat"));
    }

    #[test]
    fn test_global_options() {
        let opt = Opt::try_parse_from([
            "hashlink-chain",
            "printchain",
            "--config",
            "node.toml",
            "--wallet-file",
            "keys.dat",
        ])
        .unwrap();
        assert_eq!(opt.config, Some(PathBuf::from("node.toml")));
        assert_eq!(opt.wallet_file, PathBuf::from("keys.dat"));
    }
}
