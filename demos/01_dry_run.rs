use tokenrail::journal::MemoryJournal;
use tokenrail::logging::JsonlSink;
use tokenrail::policy::Policy;
use tokenrail::types::RunMode;
use tokenrail::{campaign, Orchestrator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api = Orchestrator::new(JsonlSink::default(), JsonlSink::default(), Policy::default());

    let spec = campaign::load_str(include_str!("lethe.yaml"))?;
    let plan = api.plan(&spec)?;

    let check = api.precheck(&plan);
    for p in check.problems() {
        eprintln!("precheck: {p}");
    }

    let journal = MemoryJournal::new(plan.name());
    let report = api.run(&plan, &journal, RunMode::DryRun)?;
    print!("{}", report.render());
    std::process::exit(report.exit_code());
}
