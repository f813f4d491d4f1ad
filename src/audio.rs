// Copyright (C) 2022 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};

use thiserror::Error;

pub use self::dsp::clip::{ClipStats, SampleFormat};
pub use self::dsp::equalizer::{Equalizer, EqSettings};
pub use self::dsp::vumeter::{VuLevels, VuSensor, VuHistory};
pub use self::mixer::{MixerConfig, MixerContext, VoiceMixer, MixContext};
pub use self::voice::Voice;

pub mod dsp;
pub mod voice;
pub mod mixer;
#[cfg(feature = "sdl")]
pub mod acore;

// ================================================================================
// Mixing constants

/// Right shift from the accumulator down to the output width (relative to 16/24 bit output)
pub const MIXING_ATTENUATION : u32 = 5;
/// Accumulator clamp range: 27 bits
pub const MIXING_CLIPMIN : i32 = -0x0400_0000;
pub const MIXING_CLIPMAX : i32 = 0x03ff_ffff;
/// Fractional bits of the fixed-point resonant filter coefficients
pub const FILTER_PRECISION : u32 = 13;
/// Equalizer bands per side
pub const MAX_EQ_BANDS : usize = 6;
/// Frames mixed per pass of the render loop
pub const MIX_BUFFER_SIZE : usize = 512;

pub const MIN_SAMPLE_RATE : u32 = 4000;
pub const MAX_SAMPLE_RATE : u32 = 192000;

// Mix flags
pub const MIX_NOISE_REDUCTION : u32 = 0x0002;
pub const MIX_EQ : u32              = 0x0100;

// ================================================================================
// Errors

/// Errors at the configuration and I/O boundary; rendering itself never fails
#[derive(Debug, Error)]
pub enum MixError {
    #[error("unsupported sample width: {0} bits (expected 8, 16, 24 or 32)")]
    UnsupportedBits(u32),
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u32),
    #[error("WAV output failed: {0}")]
    Wav(#[from] hound::Error),
    #[error("audio backend: {0}")]
    Backend(String),
}
