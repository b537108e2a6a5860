use ark_ff::UniformRand;
use binary::AirPrivateInput;
use binary::AirPublicInput;
use binary::Fp;
use builtins::pedersen::PedersenParams;
use cairo_air::CairoAir;
use layouts::CairoWitness;
use layouts::Layout;
use layouts::LayoutConfig;
use layouts::Result;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

/// Number of failing rows printed by `check-trace`
const MAX_REPORTED_VIOLATIONS: usize = 20;

#[derive(StructOpt, Debug)]
#[structopt(name = "cairo-air", about = "Cairo AIR constraint system")]
struct CairoAirOptions {
    /// Name of a preset layout
    #[structopt(long, default_value = "plain")]
    layout: String,
    /// JSON layout config. Takes precedence over `--layout`.
    #[structopt(long, parse(from_os_str))]
    layout_config: Option<PathBuf>,
    /// JSON file with the Pedersen shift point and base points
    #[structopt(long, parse(from_os_str))]
    pedersen_params: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Prints the columns, mask and constraints of a layout
    Info {
        #[structopt(long, default_value = "65536")]
        trace_len: usize,
    },
    /// Checks a public input can be proven with the layout
    CheckPublicInput {
        #[structopt(long, parse(from_os_str))]
        air_public_input: PathBuf,
    },
    /// Fills the trace of an execution and checks every constraint on it
    CheckTrace {
        #[structopt(long, parse(from_os_str))]
        air_public_input: PathBuf,
        #[structopt(long, parse(from_os_str))]
        air_private_input: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(CairoAirOptions::from_args()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(%err);
            ExitCode::FAILURE
        }
    }
}

/// Returns false if the checked input does not satisfy the constraints
fn run(options: CairoAirOptions) -> Result<bool> {
    let CairoAirOptions {
        layout,
        layout_config,
        pedersen_params,
        command,
    } = options;
    let config = match layout_config {
        Some(path) => LayoutConfig::from_json(&read_to_string(&path)?)?,
        None => LayoutConfig::from_name(&layout)?,
    };
    let pedersen_params = match pedersen_params {
        Some(path) => Some(PedersenParams::from_json(&read_to_string(&path)?)?),
        None => None,
    };

    match command {
        Command::Info { trace_len } => {
            let mut builder = Layout::<Fp>::builder(config, trace_len);
            if let Some(params) = pedersen_params {
                builder = builder.with_pedersen_params(params);
            }
            print_info(&builder.build()?);
            Ok(true)
        }
        Command::CheckPublicInput { air_public_input } => {
            let air = load_air(config, pedersen_params, &air_public_input)?;
            println!(
                "public input is valid for layout `{}` with trace length {}",
                air.layout().config().name,
                air.trace_len()
            );
            Ok(true)
        }
        Command::CheckTrace {
            air_public_input,
            air_private_input,
        } => {
            let air = load_air(config, pedersen_params, &air_public_input)?;
            let private_input = load_private_input(&air_private_input)?;
            let witness = CairoWitness::from_private_input(private_input)?;

            let mut rng = rand::thread_rng();
            let challenges = (0..air.interaction_params().num_challenges)
                .map(|_| Fp::rand(&mut rng))
                .collect::<Vec<Fp>>();
            let now = Instant::now();
            let violations = air.check_execution(&witness, &challenges)?;
            tracing::info!(elapsed = ?now.elapsed(), "checked trace");

            for violation in violations.iter().take(MAX_REPORTED_VIOLATIONS) {
                println!(
                    "constraint {} `{}` fails on row {}",
                    violation.constraint, violation.name, violation.row
                );
            }
            if violations.is_empty() {
                println!("all {} constraints hold", air.num_constraints());
            } else {
                println!("{} failing rows", violations.len());
            }
            Ok(violations.is_empty())
        }
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).map_err(binary::Error::from)?)
}

fn load_air(
    config: LayoutConfig,
    pedersen_params: Option<PedersenParams>,
    air_public_input: &Path,
) -> Result<CairoAir> {
    let public_input = AirPublicInput::<Fp>::from_json(&read_to_string(air_public_input)?)?;
    match pedersen_params {
        Some(params) => CairoAir::with_pedersen_params(config, params, public_input),
        None => CairoAir::new(config, public_input),
    }
}

/// Parses the private input. Relative trace and memory paths are resolved
/// against the directory of the private input file.
fn load_private_input(path: &Path) -> Result<AirPrivateInput> {
    let mut private_input: AirPrivateInput = serde_json::from_str(&read_to_string(path)?)?;
    if let Some(dir) = path.parent() {
        for file in [
            &mut private_input.trace_path,
            &mut private_input.memory_path,
        ] {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
    }
    Ok(private_input)
}

fn print_info(layout: &Layout<Fp>) {
    let config = layout.config();
    println!(
        "layout `{}`: trace length {}, {} columns ({} interaction), {} challenges",
        config.name,
        layout.trace_len(),
        layout.num_columns(),
        layout.num_columns() - layout.num_main_columns(),
        layout.num_challenges()
    );
    println!("builtins: {:?}", config.builtins());

    println!("\ncolumns:");
    for (i, name) in layout.column_names().iter().enumerate() {
        println!("  {i:>3} {name}");
    }

    println!("\nmask ({} cells):", layout.mask().len());
    for (column, offset) in layout.mask() {
        println!("  ({column}, {offset})");
    }

    println!("\nconstraints ({}):", layout.constraints().len());
    for (i, constraint) in layout.constraints().iter().enumerate() {
        print!("  {i:>3} {} on {:?}", constraint.name, constraint.domain);
        if !constraint.exclusions.is_empty() {
            print!(" except {:?}", constraint.exclusions);
        }
        println!();
    }
}
