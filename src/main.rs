use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use diarisk::config::{get_config_path, load_config, write_default_config, Config};
use diarisk::error::AssessmentError;
use diarisk::input::load_input;
use diarisk::interview::run_interview_stdio;
use diarisk::output::{format_json, format_result, format_tsv, should_use_colors};
use diarisk::profile::units::{feet_inches_to_cm, inches_to_cm, pounds_to_kg};
use diarisk::profile::{ActivityLevel, Ethnicity, LabValues, PatientProfile, Sex};
use diarisk::report::{load_report, save_report, AssessmentReport};
use diarisk::scoring::{RiskResult, RiskScorer};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_INPUT: i32 = 2;
const EXIT_IO: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Tsv,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Number of risk factors to list (defaults to top_factors from config)
    #[arg(long)]
    top: Option<usize>,

    /// Save the assessment as a JSON report
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// Read profile and labs from a YAML or JSON file
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = [
            "age", "sex", "activity", "ethnicity", "height_cm", "height_ft", "height_in",
            "weight_kg", "weight_lb", "waist_cm", "waist_in", "family_history", "hypertension",
            "glucose", "hba1c", "triglycerides", "hdl", "systolic_bp",
        ]
    )]
    input: Option<PathBuf>,

    /// Age in years
    #[arg(long, required_unless_present = "input")]
    age: Option<f64>,

    #[arg(long, value_enum, required_unless_present = "input")]
    sex: Option<Sex>,

    /// Weekly physical activity
    #[arg(long, value_enum, required_unless_present = "input")]
    activity: Option<ActivityLevel>,

    #[arg(long, value_enum)]
    ethnicity: Option<Ethnicity>,

    /// Height in centimetres
    #[arg(long, conflicts_with_all = ["height_ft", "height_in"])]
    height_cm: Option<f64>,

    /// Height, feet part
    #[arg(long)]
    height_ft: Option<f64>,

    /// Height, inches part (added to --height-ft)
    #[arg(long)]
    height_in: Option<f64>,

    /// Weight in kilograms
    #[arg(long, conflicts_with = "weight_lb")]
    weight_kg: Option<f64>,

    /// Weight in pounds
    #[arg(long)]
    weight_lb: Option<f64>,

    /// Waist circumference in centimetres
    #[arg(long, conflicts_with = "waist_in")]
    waist_cm: Option<f64>,

    /// Waist circumference in inches
    #[arg(long)]
    waist_in: Option<f64>,

    /// Parent, sibling or child with diabetes
    #[arg(long)]
    family_history: bool,

    /// Diagnosed high blood pressure
    #[arg(long)]
    hypertension: bool,

    /// Fasting plasma glucose, mg/dL
    #[arg(long)]
    glucose: Option<f64>,

    /// HbA1c, %
    #[arg(long)]
    hba1c: Option<f64>,

    /// Triglycerides, mg/dL
    #[arg(long)]
    triglycerides: Option<f64>,

    /// HDL cholesterol, mg/dL
    #[arg(long)]
    hdl: Option<f64>,

    /// Systolic blood pressure, mmHg
    #[arg(long)]
    systolic_bp: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate diabetes risk from command-line values or an input file
    Assess {
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Answer a questionnaire, then estimate risk
    Interview {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Display a saved report
    Show {
        /// Path of a report written with --save
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Write the default scoring rules to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "diarisk")]
#[command(about = "Heuristic type 2 diabetes risk estimate", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/diarisk/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "diarisk=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Init { force } => run_init(cli.config, force),
        Commands::Show { path, format, top } => run_show(cli.config, &path, format, top),
        Commands::Assess { profile, output } => {
            let inputs = match profile.input.as_deref() {
                Some(path) => load_input(path).map(|input| (input.profile, input.labs)),
                None => profile_from_args(&profile).map(|p| (p, labs_from_args(&profile))),
            };
            match inputs {
                Ok((patient, labs)) => run_assessment(cli.config, patient, labs, &output),
                Err(e) => {
                    eprintln!("Input error: {:#}", e);
                    input_exit_code(&e)
                }
            }
        }
        Commands::Interview { output } => match run_interview_stdio() {
            Ok(answers) => {
                println!();
                run_assessment(cli.config, answers.profile, answers.labs, &output)
            }
            Err(e) => {
                eprintln!("Interview aborted: {:#}", e);
                EXIT_IO
            }
        },
    };

    std::process::exit(code);
}

fn run_init(config_path: Option<PathBuf>, force: bool) -> i32 {
    let path = match config_path {
        Some(p) => p,
        None => match get_config_path() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Config error: {:#}", e);
                return EXIT_CONFIG;
            }
        },
    };

    match write_default_config(&path, force) {
        Ok(()) => {
            println!("Wrote default config to {}", path.display());
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to write config: {:#}", e);
            EXIT_IO
        }
    }
}

fn run_show(
    config_path: Option<PathBuf>,
    path: &std::path::Path,
    format: OutputFormat,
    top: Option<usize>,
) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let report = match load_report(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load report: {:#}", e);
            return EXIT_IO;
        }
    };

    if format == OutputFormat::Text {
        println!(
            "Report generated {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        println!(
            "Patient: {} years, {}, {:.1} cm, {:.1} kg",
            report.profile.age,
            report.profile.sex,
            report.profile.height_cm,
            report.profile.weight_kg
        );
        println!();
    }
    print_result(&report.result, format, top.unwrap_or(config.top_factors))
}

fn run_assessment(
    config_path: Option<PathBuf>,
    profile: PatientProfile,
    labs: Option<LabValues>,
    output: &OutputArgs,
) -> i32 {
    let (config, scorer) = match load_scorer(config_path) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let result = match scorer.score(&profile, labs.as_ref()) {
        Ok(r) => r,
        Err(e) => {
            report_assessment_error(&e);
            return match e {
                AssessmentError::InvalidScoring(_) => EXIT_CONFIG,
                _ => EXIT_INPUT,
            };
        }
    };

    let code = print_result(&result, output.format, output.top.unwrap_or(config.top_factors));
    if code != EXIT_SUCCESS {
        return code;
    }

    if let Some(path) = &output.save {
        let report = AssessmentReport::new(profile, labs, result);
        if let Err(e) = save_report(path, &report) {
            eprintln!("Failed to save report: {:#}", e);
            return EXIT_IO;
        }
        eprintln!("Saved report to {}", path.display());
    }

    EXIT_SUCCESS
}

/// Load config and compile the scoring rules, printing every problem found.
fn load_scorer(config_path: Option<PathBuf>) -> Result<(Config, RiskScorer), i32> {
    let config = load_config(config_path).map_err(|e| {
        eprintln!("Config error: {:#}", e);
        EXIT_CONFIG
    })?;

    let scoring = config.scoring.clone().unwrap_or_default();
    let scorer = RiskScorer::new(&scoring).map_err(|e| {
        eprintln!("Scoring config errors:");
        for detail in e.details() {
            eprintln!("  - {}", detail);
        }
        EXIT_CONFIG
    })?;

    Ok((config, scorer))
}

fn report_assessment_error(error: &AssessmentError) {
    match error {
        AssessmentError::InvalidInput(_) => eprintln!("Invalid input:"),
        AssessmentError::IncompleteLabs(_) => {
            eprintln!("Clinical assessment needs every lab value (missing_labs: reject):")
        }
        AssessmentError::InvalidScoring(_) => eprintln!("Scoring config errors:"),
    }
    for detail in error.details() {
        eprintln!("  - {}", detail);
    }
}

fn print_result(result: &RiskResult, format: OutputFormat, top: usize) -> i32 {
    match format {
        OutputFormat::Text => println!("{}", format_result(result, top, should_use_colors())),
        OutputFormat::Tsv => println!("{}", format_tsv(result, top)),
        OutputFormat::Json => match format_json(result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to format report: {:#}", e);
                return EXIT_IO;
            }
        },
    }
    EXIT_SUCCESS
}

/// Unreadable input files are I/O failures; anything else is bad input.
fn input_exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<std::io::Error>().is_some() {
        EXIT_IO
    } else {
        EXIT_INPUT
    }
}

/// Build a metric profile from command-line flags, converting imperial values.
fn profile_from_args(args: &ProfileArgs) -> anyhow::Result<PatientProfile> {
    let (Some(age), Some(sex), Some(activity)) = (args.age, args.sex, args.activity) else {
        anyhow::bail!("--age, --sex and --activity are required without --input");
    };

    let height_cm = match (args.height_cm, args.height_ft, args.height_in) {
        (Some(cm), _, _) => cm,
        (None, Some(ft), inches) => feet_inches_to_cm(ft, inches.unwrap_or(0.0)),
        (None, None, Some(inches)) => inches_to_cm(inches),
        (None, None, None) => {
            anyhow::bail!("height is required: use --height-cm or --height-ft/--height-in")
        }
    };

    let weight_kg = match (args.weight_kg, args.weight_lb) {
        (Some(kg), _) => kg,
        (None, Some(lb)) => pounds_to_kg(lb),
        (None, None) => anyhow::bail!("weight is required: use --weight-kg or --weight-lb"),
    };

    let mut profile = PatientProfile::new(age, sex, height_cm, weight_kg, activity)
        .with_family_history(args.family_history)
        .with_hypertension(args.hypertension);
    if let Some(waist) = args.waist_cm.or(args.waist_in.map(inches_to_cm)) {
        profile = profile.with_waist_cm(waist);
    }
    if let Some(ethnicity) = args.ethnicity {
        profile = profile.with_ethnicity(ethnicity);
    }
    Ok(profile)
}

fn labs_from_args(args: &ProfileArgs) -> Option<LabValues> {
    let labs = LabValues {
        fasting_glucose: args.glucose,
        hba1c: args.hba1c,
        triglycerides: args.triglycerides,
        hdl: args.hdl,
        systolic_bp: args.systolic_bp,
    };
    (!labs.is_empty()).then_some(labs)
}
