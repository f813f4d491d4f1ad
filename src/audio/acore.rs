// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};

use std::sync::{Arc, Mutex};
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

use super::dsp::vumeter::VuSensor;
use super::mixer::{MixerConfig, MixerContext, VoiceMixer};
use super::{MixError, SampleFormat};

// ================================================================================
// Playback state shared with the SDL audio thread

pub type SharedMixer = Arc<Mutex<dyn VoiceMixer + Send>>;

struct Playback {
    ctx : MixerContext,
    mixer : SharedMixer,
    vu : VuSensor,
    bytes : Vec<u8>,
}

impl AudioCallback for Playback {
    type Channel = i16;

    fn callback(&mut self, output : &mut [i16]) {
	trace!("Callback for {}", output.len());
	self.bytes.resize(output.len() * 2, 0);
	let rendered = match self.mixer.lock() {
	    Ok(mut guard) => self.ctx.read(&mut *guard, &mut self.bytes),
	    Err(_) => {
		output.fill(0);
		return;
	    }
	};
	for (dest, src) in output.iter_mut().zip(self.bytes.chunks_exact(2)) {
	    *dest = i16::from_ne_bytes([src[0], src[1]]);
	}
	self.vu.set(self.ctx.vu());
	if rendered.frames == 0 {
	    trace!("Song over, playing silence");
	}
    }
}

// ================================================================================
// ACore

/// Live output through SDL; always 16 bit, mono or stereo
pub struct ACore {
    device : AudioDevice<Playback>,
    pub config : MixerConfig,
}

impl ACore {
    /// Levels of the most recent callback
    pub fn vu_sensor(&mut self) -> VuSensor {
	let guard = self.device.lock();
	return guard.vu.clone();
    }

    pub fn pause(&self) {
	self.device.pause();
    }

    pub fn resume(&self) {
	self.device.resume();
    }

    /// Change flags, master volume and EQ on the running context
    pub fn update(&mut self, flags : u32, master_left : i32, master_right : i32) {
	let mut guard = self.device.lock();
	guard.ctx.set_flags(flags);
	guard.ctx.set_master(master_left, master_right);
	self.config = *guard.ctx.config();
    }
}

/// Open the default playback device and start rendering MIXER into it
pub fn init(sdl_context : &sdl2::Sdl, config : MixerConfig, mixer : SharedMixer) -> Result<ACore, MixError> {
    let audio = sdl_context.audio().map_err(MixError::Backend)?;
    let requested_audio = AudioSpecDesired {
	freq : Some(config.sample_rate as i32),
	channels : Some(config.channels as u8),
	samples : None,
    };

    let mut actual = config;
    let device = audio.open_playback(None, &requested_audio, |spec| {
	info!("SDL audio: {} Hz, {} channel(s), {} frames per buffer", spec.freq, spec.channels, spec.samples);
	actual.sample_rate = spec.freq as u32;
	actual.channels = u32::min(spec.channels as u32, 2);
	actual.format = SampleFormat::S16;
	Playback {
	    ctx : MixerContext::new(actual),
	    mixer,
	    vu : VuSensor::new(),
	    bytes : vec![],
	}
    }).map_err(MixError::Backend)?;

    device.resume();
    return Ok(ACore { device, config : actual });
}
