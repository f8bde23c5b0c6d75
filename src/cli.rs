use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::transcode::Backend;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `MATCH <a> <b>` or `NO MATCH`
    #[default]
    Text,
    /// One JSON object per comparison
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "audiomatch",
    about = "Report whether audio recordings are spectrally identical",
    override_usage = "audiomatch [OPTIONS] <FIRST> <SECOND>\n       audiomatch [OPTIONS] (-f <FILE> | -d <DIR>) (-f <FILE> | -d <DIR>)"
)]
pub struct Cli {
    /// Audio files (WAV, MP3) or directories of them, first then second
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// An input that must be a single audio file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Vec<PathBuf>,

    /// An input that must be a directory of audio files
    #[arg(short = 'd', long = "dir", value_name = "DIR")]
    pub dir: Vec<PathBuf>,

    /// Config file (default: audiomatch.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// How MP3 input is decoded
    #[arg(long, value_enum)]
    pub transcoder: Option<Backend>,

    /// ffmpeg executable used by the ffmpeg transcoder
    #[arg(long)]
    pub ffmpeg: Option<String>,

    /// Directory for decoded companion WAV files
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Worker threads for directory comparisons (0 = one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// What an input path is required to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Positional: a file or a directory.
    Any,
    /// `-f`
    File,
    /// `-d`
    Dir,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    pub path: PathBuf,
    pub kind: InputKind,
}

/// Parsed arguments plus the two inputs in command-line order.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    pub first: Input,
    pub second: Input,
}

/// Parses `args`, accepting positional inputs, `-f`/`-d` inputs or a mix.
pub fn parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(args)?;
    let cli = Cli::from_arg_matches(&matches)?;

    let mut inputs: Vec<(usize, Input)> = Vec::new();
    for (id, kind) in [("paths", InputKind::Any), ("file", InputKind::File), ("dir", InputKind::Dir)] {
        if let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<PathBuf>(id)) {
            inputs.extend(indices.zip(values).map(|(index, path)| {
                (
                    index,
                    Input {
                        path: path.clone(),
                        kind,
                    },
                )
            }));
        }
    }
    inputs.sort_by_key(|(index, _)| *index);

    match <[(usize, Input); 2]>::try_from(inputs) {
        Ok([(_, first), (_, second)]) => Ok(Invocation { cli, first, second }),
        Err(found) => Err(command.error(
            ErrorKind::WrongNumberOfValues,
            format!("expected exactly two inputs, found {}", found.len()),
        )),
    }
}
