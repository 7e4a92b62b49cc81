use std::path::PathBuf;

use chemworkflows::{apps, main_flow, BackendFlags, Error, OutputDirective, RunConfig};
use clap::{
    builder::{PossibleValue, PossibleValuesParser},
    Parser,
};
use tracing_subscriber::EnvFilter;

/// Run a chemistry workflow, or resume one from its checkpoint
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of the application to run
    #[arg(value_parser = application_parser())]
    appname: String,
    /// Input for the workflow.
    ///
    /// Either raw JSON such as '{"smiles": "CCO"}', a JSON or YAML file
    /// describing the molecule, or a molecule file that is passed along as is.
    /// With --restart, the checkpoint (workflow_state.json.zst) to resume.
    inputfile: String,
    /// Resume the workflow saved in the checkpoint given as input
    #[arg(long)]
    restart: bool,
    /// Write outputs here instead of a new <appname>.out.<n> directory.
    ///
    /// Existing files in the directory may be overwritten.
    #[arg(long)]
    outputdir: Option<PathBuf>,
    /// Run tasks in containers on the local docker daemon
    #[arg(long)]
    localdocker: bool,
    /// Run tasks as processes on this machine
    #[arg(long)]
    here: bool,
    /// Supply the output of a front-end task, as taskname=output.json.
    ///
    /// May be given several times.
    #[arg(long, value_name = "TASK=FILE")]
    setoutput: Vec<String>,
    /// Only run the preprocessing stage
    #[arg(long)]
    preprocess: bool,
    /// Log workflow progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn application_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(
        apps::all().map(|application| {
            PossibleValue::new(application.name()).help(application.description())
        }),
    )
}

impl Args {
    fn into_config(self) -> chemworkflows::Result<RunConfig> {
        let setoutput = self
            .setoutput
            .iter()
            .map(|directive| directive.parse::<OutputDirective>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RunConfig {
            appname: self.appname,
            inputfile: self.inputfile,
            outputdir: self.outputdir,
            restart: self.restart,
            preprocess: self.preprocess,
            setoutput,
            backend: BackendFlags {
                localdocker: self.localdocker,
                here: self.here,
                server: RunConfig::server_from_env(),
            },
        })
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(err) = args.into_config().and_then(|config| main_flow(&config)) {
        exit_with(err);
    }
}

fn exit_with(err: Error) -> ! {
    let code = err.exit_code();
    eprintln!("Error: {:#}", anyhow::Error::from(err));
    std::process::exit(code)
}
