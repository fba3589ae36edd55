//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rex_core::{Asset, Name, Symbol};

/// Resource exchange ledger driver.
#[derive(Parser, Debug, Clone)]
#[command(name = "rexctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// World file holding ledger state and simulated chain.
    #[arg(short, long, env = "REXCTL_STATE", default_value = "rex-world.json")]
    pub state: PathBuf,

    /// TOML file with ledger parameters.
    #[arg(short, long, env = "REXCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Block time: RFC 3339 or seconds since the epoch. Defaults to now.
    #[arg(short, long)]
    pub now: Option<String>,

    /// Sign as this account instead of the action's authorizer.
    #[arg(long)]
    pub signer: Option<Name>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new world with the given core token.
    Genesis {
        /// Core token symbol, e.g. `4,EOS`.
        #[arg(long)]
        core: Symbol,
        /// Initial balances as `account=quantity`.
        #[arg(long = "account", value_name = "NAME=QUANTITY")]
        accounts: Vec<String>,
        /// Overwrite an existing world file.
        #[arg(long)]
        force: bool,
    },

    /// Mint tokens to an account.
    Issue {
        /// Receiving account.
        to: Name,
        /// Tokens minted.
        quantity: Asset,
    },

    /// Vote for producers or through a proxy.
    Vote {
        /// Voting account.
        voter: Name,
        /// Proxy to vote through.
        #[arg(long, conflicts_with = "producers")]
        proxy: Option<Name>,
        /// Producers voted for.
        producers: Vec<Name>,
    },

    /// Register an account as a voting proxy.
    Regproxy {
        /// Proxy account.
        account: Name,
    },

    /// Stake tokens for NET and CPU.
    Delegate {
        /// Staking account.
        from: Name,
        /// Account receiving the resources.
        receiver: Name,
        /// NET stake.
        net: Asset,
        /// CPU stake.
        cpu: Asset,
    },

    /// Print ledger state as JSON.
    Show {
        /// What to print.
        #[command(subcommand)]
        what: ShowCommands,
    },

    /// Credit name-auction proceeds held by `eosio.names`.
    Namebid {
        /// Proceeds.
        amount: Asset,
    },

    /// Open the RAM market.
    Init {
        /// Core token symbol.
        core: Symbol,
    },
    /// Grow total RAM.
    Setram {
        /// New total in bytes.
        max_ram_size: u64,
    },
    /// Buy RAM with core tokens.
    Buyram {
        /// Paying account.
        payer: Name,
        /// Account receiving the bytes.
        receiver: Name,
        /// Tokens spent, fee included.
        quant: Asset,
    },
    /// Buy an exact number of RAM bytes.
    Buyrambytes {
        /// Paying account.
        payer: Name,
        /// Account receiving the bytes.
        receiver: Name,
        /// Bytes wanted.
        bytes: i64,
    },
    /// Buy RAM and burn it.
    Buyramburn {
        /// Paying account.
        payer: Name,
        /// Tokens spent.
        quantity: Asset,
        /// Memo.
        #[arg(default_value = "")]
        memo: String,
    },
    /// Sell RAM bytes.
    Sellram {
        /// Selling account.
        account: Name,
        /// Bytes sold.
        bytes: i64,
    },
    /// Burn RAM quota.
    Ramburn {
        /// Owner.
        owner: Name,
        /// Bytes burned.
        bytes: i64,
        /// Memo.
        #[arg(default_value = "")]
        memo: String,
    },

    /// Move tokens into the REX fund.
    Deposit {
        /// Owner.
        owner: Name,
        /// Amount.
        amount: Asset,
    },
    /// Move tokens out of the REX fund.
    Withdraw {
        /// Owner.
        owner: Name,
        /// Amount.
        amount: Asset,
    },
    /// Buy REX from the fund.
    Buyrex {
        /// Buyer.
        from: Name,
        /// Core tokens spent.
        amount: Asset,
    },
    /// Buy REX with staked tokens.
    Unstaketorex {
        /// Staking account.
        owner: Name,
        /// Account the stake was delegated to.
        receiver: Name,
        /// NET stake used.
        from_net: Asset,
        /// CPU stake used.
        from_cpu: Asset,
    },
    /// Sell REX.
    Sellrex {
        /// Seller.
        from: Name,
        /// Shares sold.
        rex: Asset,
    },
    /// Cancel a queued sell order.
    Cnclrexorder {
        /// Owner.
        owner: Name,
    },
    /// Rent CPU.
    Rentcpu {
        /// Payer.
        from: Name,
        /// Receiver.
        receiver: Name,
        /// Price of this period.
        loan_payment: Asset,
        /// Renewal reserve.
        loan_fund: Asset,
    },
    /// Rent NET.
    Rentnet {
        /// Payer.
        from: Name,
        /// Receiver.
        receiver: Name,
        /// Price of this period.
        loan_payment: Asset,
        /// Renewal reserve.
        loan_fund: Asset,
    },
    /// Top up a CPU loan.
    Fundcpuloan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Amount.
        payment: Asset,
    },
    /// Top up a NET loan.
    Fundnetloan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Amount.
        payment: Asset,
    },
    /// Withdraw from a CPU loan's reserve.
    Defcpuloan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Amount.
        amount: Asset,
    },
    /// Withdraw from a NET loan's reserve.
    Defnetloan {
        /// Loan creator.
        from: Name,
        /// Loan number.
        loan_num: u64,
        /// Amount.
        amount: Asset,
    },
    /// Rebase vote stake.
    Updaterex {
        /// Owner.
        owner: Name,
    },
    /// Run the drain.
    Rexexec {
        /// Calling account.
        user: Name,
        /// Bound per queue.
        max: u16,
    },
    /// Set the rent reserve.
    Setrex {
        /// New reserve.
        balance: Asset,
    },
    /// Merge maturity buckets.
    Consolidate {
        /// Owner.
        owner: Name,
    },
    /// Move REX into savings.
    Mvtosavings {
        /// Owner.
        owner: Name,
        /// Shares.
        rex: Asset,
    },
    /// Move REX out of savings.
    Mvfrsavings {
        /// Owner.
        owner: Name,
        /// Shares.
        rex: Asset,
    },
    /// Delete empty REX rows.
    Closerex {
        /// Owner.
        owner: Name,
    },
    /// Change maturity settings.
    Setrexmature {
        /// Days until purchases mature.
        #[arg(long)]
        buckets: Option<u32>,
        /// Place purchases directly in savings.
        #[arg(long)]
        to_savings: Option<bool>,
    },
    /// Donate to REX holders.
    Donatetorex {
        /// Donor.
        payer: Name,
        /// Tokens donated.
        quantity: Asset,
        /// Memo.
        #[arg(default_value = "")]
        memo: String,
    },
}

/// What `show` prints.
#[derive(Subcommand, Debug, Clone)]
pub enum ShowCommands {
    /// Pool, return pool and RAM totals.
    Pool,
    /// Fund, balance, order and loans of one account.
    Account {
        /// Account.
        name: Name,
    },
    /// Token balance and resources of one account.
    Chain {
        /// Account.
        name: Name,
    },
    /// The whole world.
    All,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_buyrex() {
        let cli = Cli::try_parse_from([
            "rexctl",
            "--state",
            "w.json",
            "buyrex",
            "alice",
            "1.0000 EOS",
        ])
        .unwrap();
        match cli.command {
            Commands::Buyrex { from, amount } => {
                assert_eq!(from.to_string(), "alice");
                assert_eq!(amount.to_string(), "1.0000 EOS");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_name() {
        assert!(Cli::try_parse_from(["rexctl", "closerex", "Alice"]).is_err());
    }
}
