// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

use std::path::PathBuf;
use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Render the built-in test song through the mixer", long_about = None)]
pub struct Cli {
    /// Output path (.wav)
    #[arg(short, long, default_value = "trackmix.wav")]
    pub output: PathBuf,

    /// Sample rate in Hz (clamped to 4000..=192000)
    #[arg(short, long, default_value_t = 44100)]
    pub rate: u32,

    /// Output sample width: 8, 16, 24 or 32
    #[arg(short, long, default_value_t = 16)]
    pub bits: u32,

    /// 1 (mono) or 2 (stereo)
    #[arg(short, long, default_value_t = 2)]
    pub channels: u32,

    /// Stop rendering after this many seconds, even if the song continues
    #[arg(short, long, default_value_t = 8.0)]
    pub seconds: f32,

    /// Enable noise reduction
    #[arg(long)]
    pub nr: bool,

    /// Comma-separated EQ gains (0-64), up to four bands; enables the equalizer
    #[arg(long, value_delimiter = ',')]
    pub eq: Vec<u32>,

    /// Comma-separated EQ band positions (0-127), matching --eq
    #[arg(long, value_delimiter = ',')]
    pub eq_freq: Vec<u32>,

    /// Master volume, left and right (31 = unity)
    #[arg(short, long, default_value_t = 31)]
    pub master: i32,

    /// Play through SDL instead of writing a file (needs the `sdl` feature)
    #[arg(short, long)]
    pub play: bool,
}
