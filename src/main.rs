mod channel;
mod convert;
mod encode;
mod merge;
mod render;
mod time;
mod timeline;

use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use midly::Smf;

use crate::{channel::ChannelMap, convert::Options};

/// Converts a type 1 MIDI file to MML, with one output track per MIDI
/// channel. Outputs to stdout.
///
/// Suggested usage is to create your own template MML containing the
/// instrument definitions, then append the output to the template.
#[derive(Parser)]
#[command(version, about, infer_long_args = true)]
struct Cli {
    /// Input MIDI file
    filename: PathBuf,

    /// MIDI channel to MML track map, one letter per channel
    #[arg(short, long, default_value = channel::DEFAULT_CHANNEL_MAP)]
    map: String,
}

fn run(args: Cli) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&args.filename)?;
    let smf = Smf::parse(&bytes)?;
    let opts = Options {
        channel_map: ChannelMap::new(&args.map),
        ..Options::default()
    };
    print!("{}", convert::convert(&smf, &opts)?);
    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        let args = std::env::args()
            .skip(1)
            .fold(String::new(), |a, b| a + " " + &b);
        eprintln!(
            "`{}{args}`: error: {e}",
            std::env::current_exe()
                .ok()
                .as_ref()
                .and_then(|p| p.file_stem())
                .map(|p| p.to_string_lossy())
                .unwrap_or(env!("CARGO_PKG_NAME").into())
        );
        std::process::exit(1);
    }
}
