use std::path::PathBuf;

use clap::{AppSettings, Parser};
use log::{debug, info};

use iris_sji::{read_iris_sji_level2_fits, IngestOptions, SjiData, SjiError};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// IRIS level 2 SJI FITS files. If there is more than one, they must all
    /// belong to the same OBS.
    #[clap(required = true)]
    data: Vec<PathBuf>,

    /// Read the data unscaled. Unscaled data have no mask or uncertainty and
    /// can't be exposure-time corrected.
    #[clap(long)]
    memmap: bool,

    /// Apply the exposure-time correction before summarising.
    #[clap(short, long)]
    exposure_correction: bool,

    /// Apply the exposure-time correction even if the unit says it has
    /// already been applied.
    #[clap(long, requires = "exposure-correction")]
    force: bool,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);

    if let Err(e) = try_main(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main(args: Args) -> Result<(), SjiError> {
    let options = IngestOptions {
        memory_map: args.memmap,
    };
    info!("Reading {} file(s) (memmap: {})", args.data.len(), options.memory_map);
    let mut data = read_iris_sji_level2_fits(&args.data, options)?;

    if args.exposure_correction {
        debug!("Applying exposure-time correction (force: {})", args.force);
        data = match data {
            SjiData::Cube(cube) => {
                SjiData::Cube(cube.apply_exposure_time_correction(false, args.force)?)
            }
            SjiData::Sequence(seq) => {
                let meta = seq.meta().clone();
                let cubes = seq
                    .iter()
                    .map(|cube| cube.apply_exposure_time_correction(false, args.force))
                    .collect::<Result<Vec<_>, _>>()?;
                SjiData::Sequence(iris_sji::SjiCubeSequence::new(cubes, Some(meta))?)
            }
        };
    }

    println!("{data}");
    Ok(())
}

/// Log to stderr; stdout is reserved for the summary.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .format_target(verbosity > 1)
        .filter_level(level)
        .init();
}
