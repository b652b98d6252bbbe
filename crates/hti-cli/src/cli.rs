use clap::{Args, Parser, Subcommand, ValueEnum};
use hti_ice::engine::post::IntegrationMethod;
use hti_ice::workflows::compute::FreeEnergyType;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "hti_ice",
    version,
    about = "Compute free energy of ice by Hamiltonian TI",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true, subcommand_help_heading = "Valid subcommands")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a job
    Gen(GenArgs),
    /// Refine the grid of a job
    Refine(RefineArgs),
    /// Compute the result of a job
    Compute(ComputeArgs),
}

#[derive(Args, Debug)]
pub struct GenArgs {
    /// JSON parameter file
    #[arg(value_name = "PARAM")]
    pub param: PathBuf,

    /// Use Frenkel's Einstein crystal approach: remove COM
    #[arg(short, long)]
    pub frenkel: bool,

    /// The output folder for the job
    #[arg(short, long, default_value = "new_job", value_name = "DIR")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct RefineArgs {
    /// Input job
    #[arg(short, long, required = true, value_name = "JOB")]
    pub input: PathBuf,

    /// Output job
    #[arg(short, long, required = true, value_name = "JOB")]
    pub output: PathBuf,

    /// The error required, in eV per molecule as reported by `compute`
    #[arg(short, long, required = true, value_name = "FLOAT")]
    pub error: f64,
}

#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Folder of the job
    #[arg(value_name = "JOB")]
    pub job: PathBuf,

    /// The type of free energy
    #[arg(short = 't', long = "type", value_enum, default_value_t = FreeEnergyArg::Helmholtz)]
    pub free_energy_type: FreeEnergyArg,

    /// The method of thermodynamic integration
    #[arg(short = 'm', long, value_enum, default_value_t = InteMethodArg::Inte)]
    pub inte_method: InteMethodArg,

    /// Apply disorder correction for ice
    #[arg(short, long)]
    pub disorder_corr: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeEnergyArg {
    Helmholtz,
    Gibbs,
}

impl From<FreeEnergyArg> for FreeEnergyType {
    fn from(arg: FreeEnergyArg) -> Self {
        match arg {
            FreeEnergyArg::Helmholtz => FreeEnergyType::Helmholtz,
            FreeEnergyArg::Gibbs => FreeEnergyType::Gibbs,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteMethodArg {
    Inte,
    Mbar,
}

impl From<InteMethodArg> for IntegrationMethod {
    fn from(arg: InteMethodArg) -> Self {
        match arg {
            InteMethodArg::Inte => IntegrationMethod::Inte,
            InteMethodArg::Mbar => IntegrationMethod::Mbar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("hti_ice").chain(args.iter().copied()))
    }

    #[test]
    fn no_subcommand_is_accepted() {
        let cli = parse(&[]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn gen_defaults_to_vega_and_new_job() {
        let cli = parse(&["gen", "param.json"]).unwrap();
        let Some(Commands::Gen(args)) = cli.command else {
            panic!("expected gen");
        };
        assert_eq!(args.param, PathBuf::from("param.json"));
        assert!(!args.frenkel);
        assert_eq!(args.output, PathBuf::from("new_job"));

        let cli = parse(&["gen", "param.json", "-f", "-o", "job"]).unwrap();
        let Some(Commands::Gen(args)) = cli.command else {
            panic!("expected gen");
        };
        assert!(args.frenkel);
        assert_eq!(args.output, PathBuf::from("job"));
    }

    #[test]
    fn refine_requires_all_three_options() {
        let cli = parse(&["refine", "-i", "a", "-o", "b", "-e", "0.01"]).unwrap();
        let Some(Commands::Refine(args)) = cli.command else {
            panic!("expected refine");
        };
        assert_eq!(args.error, 0.01);

        let err = parse(&["refine", "-i", "a", "-o", "b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        let err = parse(&["refine", "-i", "a", "-o", "b", "-e", "small"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn compute_options_map_to_engine_types() {
        let cli = parse(&["compute", "job", "-t", "gibbs", "-m", "mbar", "-d"]).unwrap();
        let Some(Commands::Compute(args)) = cli.command else {
            panic!("expected compute");
        };
        assert_eq!(FreeEnergyType::from(args.free_energy_type), FreeEnergyType::Gibbs);
        assert_eq!(IntegrationMethod::from(args.inte_method), IntegrationMethod::Mbar);
        assert!(args.disorder_corr);

        let cli = parse(&["compute", "job"]).unwrap();
        let Some(Commands::Compute(args)) = cli.command else {
            panic!("expected compute");
        };
        assert_eq!(args.free_energy_type, FreeEnergyArg::Helmholtz);
        assert_eq!(args.inte_method, InteMethodArg::Inte);
        assert!(!args.disorder_corr);
    }

    #[test]
    fn unknown_choices_are_rejected() {
        let err = parse(&["compute", "job", "-m", "bar"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        let err = parse(&["compute", "job", "--type", "enthalpy"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn global_logging_flags_follow_the_subcommand() {
        let cli = parse(&["compute", "job", "-vv", "--log-file", "run.log"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        assert!(parse(&["-q", "-v", "compute", "job"]).is_err());
    }
}
