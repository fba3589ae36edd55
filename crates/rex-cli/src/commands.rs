//! Command execution.
//!
//! Ledger actions go through [`RexEngine::apply`]; chain commands
//! (`issue`, `vote`, `delegate`) touch the simulated host directly.

use std::io::Write;
use std::path::Path;

use anyhow::{Context as _, Result, bail};
use rex_core::{Name, TimePointSec};
use rex_ledger::{
    Action, ActionOutcome, InMemoryHost, ResourceLedger, RexConfig, RexEngine, TokenLedger,
};
use serde_json::json;
use tracing::info;

use crate::cli::{Cli, Commands, ShowCommands};
use crate::world::{World, parse_balance};

/// Parses `--now`: seconds since the epoch or RFC 3339.
///
/// # Errors
///
/// Returns error if the value is neither.
pub fn parse_time(value: &str) -> Result<TimePointSec> {
    if let Ok(secs) = value.parse::<u32>() {
        return Ok(TimePointSec::from_secs(secs));
    }
    let dt = chrono::DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid time {value:?}"))?;
    Ok(TimePointSec::from_datetime(dt.with_timezone(&chrono::Utc))?)
}

/// Loads the ledger configuration.
///
/// # Errors
///
/// Returns error if the file cannot be read or is invalid.
pub fn load_config(path: Option<&Path>) -> Result<RexConfig> {
    match path {
        Some(path) => RexConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RexConfig::default()),
    }
}

/// Ledger action for a command, if it is one.
pub fn to_action(command: &Commands) -> Option<Action> {
    let action = match command.clone() {
        Commands::Init { core } => Action::Init { core },
        Commands::Setram { max_ram_size } => Action::SetRam { max_ram_size },
        Commands::Buyram {
            payer,
            receiver,
            quant,
        } => Action::BuyRam {
            payer,
            receiver,
            quant,
        },
        Commands::Buyrambytes {
            payer,
            receiver,
            bytes,
        } => Action::BuyRamBytes {
            payer,
            receiver,
            bytes,
        },
        Commands::Buyramburn {
            payer,
            quantity,
            memo,
        } => Action::BuyRamBurn {
            payer,
            quantity,
            memo,
        },
        Commands::Sellram { account, bytes } => Action::SellRam { account, bytes },
        Commands::Ramburn { owner, bytes, memo } => Action::RamBurn { owner, bytes, memo },
        Commands::Deposit { owner, amount } => Action::Deposit { owner, amount },
        Commands::Withdraw { owner, amount } => Action::Withdraw { owner, amount },
        Commands::Buyrex { from, amount } => Action::BuyRex { from, amount },
        Commands::Unstaketorex {
            owner,
            receiver,
            from_net,
            from_cpu,
        } => Action::UnstakeToRex {
            owner,
            receiver,
            from_net,
            from_cpu,
        },
        Commands::Sellrex { from, rex } => Action::SellRex { from, rex },
        Commands::Cnclrexorder { owner } => Action::CnclRexOrder { owner },
        Commands::Rentcpu {
            from,
            receiver,
            loan_payment,
            loan_fund,
        } => Action::RentCpu {
            from,
            receiver,
            loan_payment,
            loan_fund,
        },
        Commands::Rentnet {
            from,
            receiver,
            loan_payment,
            loan_fund,
        } => Action::RentNet {
            from,
            receiver,
            loan_payment,
            loan_fund,
        },
        Commands::Fundcpuloan {
            from,
            loan_num,
            payment,
        } => Action::FundCpuLoan {
            from,
            loan_num,
            payment,
        },
        Commands::Fundnetloan {
            from,
            loan_num,
            payment,
        } => Action::FundNetLoan {
            from,
            loan_num,
            payment,
        },
        Commands::Defcpuloan {
            from,
            loan_num,
            amount,
        } => Action::DefCpuLoan {
            from,
            loan_num,
            amount,
        },
        Commands::Defnetloan {
            from,
            loan_num,
            amount,
        } => Action::DefNetLoan {
            from,
            loan_num,
            amount,
        },
        Commands::Updaterex { owner } => Action::UpdateRex { owner },
        Commands::Rexexec { user, max } => Action::RexExec { user, max },
        Commands::Setrex { balance } => Action::SetRex { balance },
        Commands::Consolidate { owner } => Action::Consolidate { owner },
        Commands::Mvtosavings { owner, rex } => Action::MvToSavings { owner, rex },
        Commands::Mvfrsavings { owner, rex } => Action::MvFrSavings { owner, rex },
        Commands::Closerex { owner } => Action::CloseRex { owner },
        Commands::Setrexmature {
            buckets,
            to_savings,
        } => Action::SetRexMature {
            num_of_maturity_buckets: buckets,
            buy_rex_to_savings: to_savings,
        },
        Commands::Donatetorex {
            payer,
            quantity,
            memo,
        } => Action::DonateToRex {
            payer,
            quantity,
            memo,
        },
        Commands::Genesis { .. }
        | Commands::Issue { .. }
        | Commands::Vote { .. }
        | Commands::Regproxy { .. }
        | Commands::Delegate { .. }
        | Commands::Show { .. }
        | Commands::Namebid { .. } => return None,
    };
    Some(action)
}

fn print_outcome(out: &mut impl Write, outcome: &ActionOutcome) -> Result<()> {
    for notice in &outcome.notices {
        writeln!(out, "{}", serde_json::to_string(notice)?)?;
    }
    if outcome.report.processed() > 0 {
        writeln!(out, "{}", serde_json::to_string(&outcome.report)?)?;
    }
    Ok(())
}

fn show(out: &mut impl Write, world: &World, what: &ShowCommands) -> Result<()> {
    let state = &world.state;
    let value = match what {
        ShowCommands::Pool => json!({
            "pool": state.pool,
            "return_pool": state.return_pool,
            "ram": state.ram,
            "ram_market": state.ram_market,
            "maturity": state.maturity,
        }),
        ShowCommands::Account { name } => {
            let name = *name;
            let cpu: Vec<_> = state.cpu_loans.loans_from(name).collect();
            let net: Vec<_> = state.net_loans.loans_from(name).collect();
            json!({
                "fund": state.funds.get(&name),
                "balance": state.balances.get(&name),
                "order": state.orders.get(name),
                "cpu_loans": cpu,
                "net_loans": net,
            })
        }
        ShowCommands::Chain { name } => {
            let host = &world.host;
            let core = host.core_symbol();
            json!({
                "balance": core.map(|c| host.balance_of(*name, c)),
                "resources": host.resources(*name),
                "ram_bytes": host.ram_bytes(*name),
                "voter": host.voter(*name),
            })
        }
        ShowCommands::All => serde_json::to_value(world)?,
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

fn apply(
    engine: &mut RexEngine<InMemoryHost>,
    now: TimePointSec,
    signer: Option<Name>,
    action: &Action,
) -> Result<ActionOutcome> {
    let signer = signer.unwrap_or_else(|| action.authorizer());
    let outcome = engine
        .apply(now, signer, action)
        .with_context(|| format!("{} failed", action.name()))?;
    Ok(outcome)
}

/// Runs one invocation against the world file.
///
/// # Errors
///
/// Returns error if the world cannot be loaded or saved, or the command
/// fails. A failed command leaves the world file untouched.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let now = match &cli.now {
        Some(value) => parse_time(value)?,
        None => TimePointSec::now()?,
    };

    if let Commands::Genesis {
        core,
        accounts,
        force,
    } = &cli.command
    {
        if cli.state.exists() && !force {
            bail!("{} already exists; pass --force to replace it", cli.state.display());
        }
        let balances = accounts
            .iter()
            .map(|s| parse_balance(s))
            .collect::<Result<Vec<_>>>()?;
        let world = World::genesis(*core, &balances, &config)?;
        world.save(&cli.state)?;
        info!(path = %cli.state.display(), core = %core, accounts = balances.len(), "world created");
        writeln!(out, "created {}", cli.state.display())?;
        return Ok(());
    }

    let mut world = World::load(&cli.state)?;
    if let Commands::Show { what } = &cli.command {
        return show(out, &world, what);
    }

    match &cli.command {
        Commands::Issue { to, quantity } => world.host.issue(*to, *quantity)?,
        Commands::Vote {
            voter,
            proxy,
            producers,
        } => world.host.vote(*voter, *proxy, producers.clone())?,
        Commands::Regproxy { account } => world.host.register_proxy(*account),
        Commands::Delegate {
            from,
            receiver,
            net,
            cpu,
        } => world.host.delegate(*from, *receiver, *net, *cpu)?,
        Commands::Namebid { amount } => {
            let mut engine = world.into_engine(config);
            let outcome = engine.channel_namebid(now, *amount)?;
            print_outcome(out, &outcome)?;
            world = World::from_engine(engine);
        }
        command => {
            let Some(action) = to_action(command) else {
                bail!("unsupported command");
            };
            let mut engine = world.into_engine(config);
            let outcome = apply(&mut engine, now, cli.signer, &action)?;
            print_outcome(out, &outcome)?;
            world = World::from_engine(engine);
        }
    }
    world.save(&cli.state)
}
