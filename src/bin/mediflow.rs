use std::path::Path;

use mediflow::config::{self, Command, FormatArg};
use mediflow::error::Result;
use mediflow::output::{self, Formatter, HumanFormatter, JsonFormatter, Report, SummaryFormatter};
use mediflow::report;
use mediflow::roster;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        log::debug!("failed with {}", err.kind());
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;

    match cli.command {
        Command::Simulate(args) => {
            let app = config::load_or_default(args.config.as_deref())?;
            let params = config::simulation_parameters(&args, &app.simulator)?;
            let report = report::simulation_report(&params)?;
            emit(
                Report::Simulation(&report),
                args.format,
                args.export.as_deref(),
            )
        }
        Command::Optimize(args) => {
            let app = config::load_or_default(args.config.as_deref())?;
            let report = report::optimize_report(&app.optimiser, &config::solve_options(&args))?;
            emit(Report::Optimize(&report), args.format, args.export.as_deref())
        }
        Command::Analyze(args) => {
            let app = config::load_or_default(args.config.as_deref())?;
            let report = roster::analyze(&app.optimiser)?;
            emit(Report::Analysis(&report), args.format, None)
        }
        Command::ShowConfig(args) => {
            let app = config::load_or_default(args.config.as_deref())?;
            print!("{}", JsonFormatter.config(&app)?);
            Ok(())
        }
    }
}

fn emit(report: Report<'_>, format: FormatArg, export: Option<&Path>) -> Result<()> {
    let formatter = formatter_for(format);
    print!("{}", formatter.write(&report)?);
    if let Some(path) = export {
        output::export_json(path, &report)?;
    }
    Ok(())
}

fn formatter_for(format: FormatArg) -> Box<dyn Formatter> {
    match format {
        FormatArg::Human => Box::new(HumanFormatter),
        FormatArg::Summary => Box::new(SummaryFormatter),
        FormatArg::Json => Box::new(JsonFormatter),
    }
}
