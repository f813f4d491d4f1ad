// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};
#[allow(unused)]
use crate::{ptrace, pdebug, pinfo, pwarn, perror};

use super::dsp::{clip, equalizer::{Equalizer, EqSettings}, mixbuf, noise::NoiseReduction, normalize, offset::{self, DryOffset}};
use super::dsp::clip::{ClipStats, SampleFormat};
use super::dsp::vumeter::VuLevels;
use super::voice::Voice;
use super::{MixError, MIX_BUFFER_SIZE, MIX_EQ, MIX_NOISE_REDUCTION, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE};
use super::dsp::normalize::MASTER_UNITY;

// ================================================================================
// Configuration

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixerConfig {
    pub sample_rate : u32,
    /// 1 (mono) or 2 (interleaved stereo)
    pub channels : u32,
    pub format : SampleFormat,
    /// MIX_* flags
    pub flags : u32,
    pub master_left : i32,
    pub master_right : i32,
    pub eq : EqSettings,
}

impl MixerConfig {
    pub fn new(sample_rate : u32, channels : u32, bits : u32) -> Result<MixerConfig, MixError> {
	if channels != 1 && channels != 2 {
	    return Err(MixError::UnsupportedChannels(channels));
	}
	return Ok(MixerConfig {
	    sample_rate,
	    channels,
	    format : SampleFormat::from_bits(bits)?,
	    ..MixerConfig::default()
	});
    }

    pub fn stereo(&self) -> bool {
	return self.channels >= 2;
    }

    /// Bytes per output frame
    pub fn frame_bytes(&self) -> usize {
	return self.channels as usize * self.format.bytes_per_sample();
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
	MixerConfig {
	    sample_rate : 44100,
	    channels : 2,
	    format : SampleFormat::S16,
	    flags : 0,
	    master_left : MASTER_UNITY,
	    master_right : MASTER_UNITY,
	    eq : EqSettings::default(),
	}
    }
}

// ================================================================================
// Voice mixing interface

/// What a voice mixer may use from the context while mixing one pass
pub struct MixContext<'a> {
    pub sample_rate : u32,
    dry : &'a mut DryOffset,
}

impl<'a> MixContext<'a> {
    /// VOICE stopped during this pass: fade its offset and hand the rest to the context
    pub fn retire(&mut self, voice : &mut Voice, buffer : &mut [i32], frames : usize) {
	offset::retire_offset(voice, buffer, frames, self.dry);
    }
}

/// The song player: accumulates all playing voices into the stereo accumulator.
///
/// The accumulator arrives prepared (cleared, or carrying the fade of stopped voices)
/// and holds `frames` interleaved stereo frames.  Returns false once the song has ended;
/// nothing mixed in that call is played.
pub trait VoiceMixer {
    fn mix(&mut self, ctx : &mut MixContext<'_>, accumulator : &mut [i32], frames : usize) -> bool;
}

/// Result of one `MixerContext::read`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// Frames of audio produced (the rest of the output, if any, is silence)
    pub frames : usize,
    /// Bytes of audio produced
    pub bytes : usize,
    pub stats : ClipStats,
}

// ================================================================================
// MixerContext

pub struct MixerContext {
    config : MixerConfig,
    accumulator : Vec<i32>,
    eq : Equalizer,
    noise : NoiseReduction,
    dry : DryOffset,
    vu : VuLevels,
    ended : bool,
}

impl MixerContext {
    pub fn new(config : MixerConfig) -> MixerContext {
	let mut ctx = MixerContext {
	    config,
	    accumulator : vec![0; MIX_BUFFER_SIZE * 2],
	    eq : Equalizer::new(),
	    noise : NoiseReduction::new(),
	    dry : DryOffset::new(),
	    vu : VuLevels::default(),
	    ended : false,
	};
	ctx.init(true);
	return ctx;
    }

    fn init(&mut self, reset : bool) {
	self.config.sample_rate = self.config.sample_rate.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE);
	self.dry.reset();
	if reset {
	    self.vu = VuLevels::default();
	    self.noise.reset();
	}
	self.init_eq(reset);
	info!("Mixer at {} Hz, {} channel(s), {}, flags {:#x}",
	      self.config.sample_rate, self.config.channels, self.config.format, self.config.flags);
    }

    pub fn config(&self) -> &MixerConfig {
	return &self.config;
    }

    /// Switch output parameters; DSP state is reset if rate, width or channels change
    pub fn set_config(&mut self, config : MixerConfig) {
	let old = self.config;
	self.config = config;
	let reset = old.sample_rate != config.sample_rate
	    || old.format != config.format
	    || old.channels != config.channels;
	self.init(reset);
    }

    pub fn set_flags(&mut self, flags : u32) {
	self.config.flags = flags;
	self.init(false);
    }

    pub fn set_master(&mut self, left : i32, right : i32) {
	self.config.master_left = left;
	self.config.master_right = right;
    }

    pub fn equalizer(&self) -> &Equalizer {
	return &self.eq;
    }

    /// Low-level band control, see `Equalizer::set_gains`
    pub fn set_eq_gains(&mut self, gains : &[u32], num_gains : usize, frequencies : Option<&[u32]>, reset : bool) {
	self.eq.set_gains(gains, num_gains, frequencies, reset, self.config.sample_rate);
    }

    pub fn set_eq(&mut self, settings : EqSettings, reset : bool) {
	self.config.eq = settings;
	self.init_eq(reset);
    }

    /// Reapply the configured user EQ at the current sample rate
    pub fn init_eq(&mut self, reset : bool) {
	self.config.eq.apply(&mut self.eq, reset, self.config.sample_rate);
    }

    pub fn frame_bytes(&self) -> usize {
	return self.config.frame_bytes();
    }

    /// Levels of the last `read`
    pub fn vu(&self) -> VuLevels {
	return self.vu;
    }

    pub fn ended(&self) -> bool {
	return self.ended;
    }

    /// Allow rendering again after the song ended
    pub fn restart(&mut self) {
	self.ended = false;
	self.dry.reset();
    }

    /// Fill OUT with as many whole frames as fit
    ///
    /// Audio comes from MIXER in passes of at most MIX_BUFFER_SIZE frames.  Once the song
    /// ends, the remaining frames are filled with silence.
    pub fn read<M : VoiceMixer + ?Sized>(&mut self, mixer : &mut M, out : &mut [u8]) -> Rendered {
	let frame_bytes = self.frame_bytes();
	let max = out.len() / frame_bytes;
	let mut stats = ClipStats::new();
	let stereo = self.config.stereo();
	let format = self.config.format;
	let mut done = 0;

	if max == 0 {
	    pwarn!("[mixer] output buffer of {} bytes holds no frame", out.len());
	    return Rendered { frames : 0, bytes : 0, stats };
	}

	while done < max && !self.ended {
	    let count = usize::min(MIX_BUFFER_SIZE, max - done);

	    mixbuf::fill_stereo_with_decay(&mut self.accumulator, count, &mut self.dry.rofs, &mut self.dry.lofs);

	    let mut ctx = MixContext {
		sample_rate : self.config.sample_rate,
		dry : &mut self.dry,
	    };
	    if !mixer.mix(&mut ctx, &mut self.accumulator[..count * 2], count) {
		debug!("Song ended after {done} of {max} frames");
		self.ended = true;
		break;
	    }

	    let samples = if stereo {
		count * 2
	    } else {
		mixbuf::mono_from_stereo(&mut self.accumulator, count);
		count
	    };
	    let acc = &mut self.accumulator[..samples];

	    if self.config.flags & MIX_NOISE_REDUCTION != 0 {
		if stereo {
		    self.noise.apply_stereo(acc, count);
		} else {
		    self.noise.apply_mono(acc, count);
		}
	    }

	    if self.config.flags & MIX_EQ != 0 {
		if stereo {
		    self.eq.apply_stereo(acc, count);
		} else {
		    self.eq.apply_mono(acc, count);
		}
	    }

	    if stereo {
		normalize::apply_stereo(acc, count, self.config.master_left, self.config.master_right);
	    } else {
		normalize::apply_mono(acc, count, self.config.master_left, self.config.master_right);
	    }

	    clip::convert(format, &mut out[done * frame_bytes..], acc, samples, &mut stats);
	    done += count;
	}

	if done < max {
	    out[done * frame_bytes..max * frame_bytes].fill(format.silence());
	}

	self.vu = VuLevels::from_stats(&stats);
	ptrace!("[mixer] {done}/{max} frames, vu {:?}", self.vu);
	return Rendered { frames : done, bytes : done * frame_bytes, stats };
    }
}
