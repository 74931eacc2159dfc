use std::sync::Arc;

use tokenrail::adapters::{FaultKind, FileLockManager, SimKind, SimLedger};
use tokenrail::journal::FileJournal;
use tokenrail::logging::LogSink;
use tokenrail::policy::Policy;
use tokenrail::types::{Amount, RunMode};
use tokenrail::{campaign, Orchestrator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sim = SimLedger::new();
    sim.register("LetheWhitelist", SimKind::Whitelist);
    sim.register(
        "Lethe",
        SimKind::Token {
            supply: Amount::tokens(690_000_000, 18),
            gated_by_arg: Some(0),
        },
    );
    sim.register("ICOContract", SimKind::Generic);
    sim.register("TokenLock", SimKind::Vesting { token_arg: 0 });
    // The connection drops after a dozen transactions.
    sim.offline_after(12);
    let sim = Arc::new(sim);

    let td = tempfile::tempdir()?;
    let mut policy = Policy::production_preset();
    policy.retry.backoff_base_ms = 10;
    let api = Orchestrator::new(LogSink, LogSink, policy)
        .with_ledger(sim.clone())
        .with_lock_manager(Box::new(FileLockManager::for_campaign(td.path(), "lethe")))
        .with_lock_timeout_ms(500);

    let spec = campaign::load_str(include_str!("lethe.yaml"))?;
    let plan = api.plan(&spec)?;

    let first = api.run(&plan, &FileJournal::open(td.path(), plan.name())?, RunMode::Commit)?;
    print!("{}", first.render());

    sim.set_online();
    sim.fail_next("transfer", FaultKind::Transient, 1);
    let second = api.run(&plan, &FileJournal::open(td.path(), plan.name())?, RunMode::Commit)?;
    print!("{}", second.render());
    println!(
        "submissions: {} ({} confirmed on chain)",
        sim.submissions().len(),
        sim.submissions().iter().filter(|s| s.ok).count()
    );
    std::process::exit(second.exit_code());
}
