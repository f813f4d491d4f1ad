// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};
#[allow(unused)]
use crate::{ptrace, pdebug, pinfo, pwarn, perror};

/// Per-voice two-pole resonant lowpass
///
/// Coefficients are derived once per tick from the voice's cutoff and resonance bytes
/// and stored as fixed-point integers; the voice mixer then runs `process` per sample.

use std::f32::consts::PI;

use crate::audio::voice::{Voice, FILTER, NEW_NOTE};
use crate::audio::FILTER_PRECISION;

const RESONANCE_STEPS : usize = 128;
// cutoff byte -> octaves above the base frequency
const FREQ_PARAM_MULT : f32 = 128.0 / (24.0 * 256.0);
const BASE_FREQ : f32 = 110.0;

lazy_static! {
    /// Twice the damping factor per resonance step: 24 dB spread over 128 steps
    pub static ref RESONANCE_TABLE : [f32; RESONANCE_STEPS] = {
	let mut table = [0.0; RESONANCE_STEPS];
	for (i, d) in table.iter_mut().enumerate() {
	    *d = f32::powf(10.0, -(i as f32) * 24.0 / (20.0 * RESONANCE_STEPS as f32));
	}
	table
    };
}

fn damping(resonance : u32) -> f32 {
    let index = usize::min(resonance as usize, RESONANCE_STEPS - 1);
    return RESONANCE_TABLE[index];
}

/// Cutoff frequency in Hz for an (already modulated) cutoff byte, limited to Nyquist
pub fn cutoff_frequency(cutoff : u32, sample_rate : u32) -> f32 {
    let frequency = BASE_FREQ * f32::powf(2.0, cutoff as f32 * FREQ_PARAM_MULT + 0.25);
    let nyquist = sample_rate as f32 / 2.0;
    return f32::min(frequency, nyquist);
}

/// Recompute the filter coefficients of VOICE
///
/// MODIFIER scales the cutoff by (modifier + 256) / 256, e.g. from a filter envelope.
/// RESET clears the filter history (new note or retrigger).
pub fn configure(voice : &mut Voice, reset : bool, modifier : i32, sample_rate : u32) {
    let cutoff = i32::min(255, voice.cutoff.min(255) as i32 * (modifier + 256) / 256);
    let cutoff = i32::max(0, cutoff) as u32;
    let resonance = u32::min(voice.resonance, 255);

    if resonance == 0 && cutoff >= 254 {
	// Fully open filter: only a fresh note switches it off; otherwise keep the old setup
	if voice.has_flag(NEW_NOTE) {
	    voice.clear_flag(FILTER);
	}
	return;
    }
    voice.set_flag(FILTER);

    let sample_rate_f = sample_rate as f32;
    let frequency = cutoff_frequency(cutoff, sample_rate);
    let r = sample_rate_f / (2.0 * PI * frequency);

    let dmp = damping(resonance);
    let d = dmp * r + dmp - 1.0;
    let e = r * r;

    let fg = 1.0 / (1.0 + d + e);
    let fb0 = (d + e + e) / (1.0 + d + e);
    let fb1 = -e / (1.0 + d + e);

    let scale = (1 << FILTER_PRECISION) as f32;
    voice.filter_a0 = (fg * scale) as i32;
    voice.filter_b0 = (fb0 * scale) as i32;
    voice.filter_b1 = (fb1 * scale) as i32;

    ptrace!("[filter] cutoff {cutoff} res {resonance} -> {frequency:.1} Hz, a0={} b0={} b1={}",
	    voice.filter_a0, voice.filter_b0, voice.filter_b1);

    if reset {
	voice.filter_y = [[0; 2]; 2];
    }
}

// ================================================================================
// Sample processing

/// One filter step for SIDE (0 = left/mono, 1 = right)
#[inline]
pub fn process(voice : &mut Voice, side : usize, input : i32) -> i32 {
    let [y1, y2] = voice.filter_y[side];
    let acc = input as i64 * voice.filter_a0 as i64
	+ y1 as i64 * voice.filter_b0 as i64
	+ y2 as i64 * voice.filter_b1 as i64
	+ (1i64 << (FILTER_PRECISION - 1));
    let out = (acc >> FILTER_PRECISION) as i32;
    voice.filter_y[side] = [out, y1];
    return out;
}

/// Filter a block of mono voice samples in place; no-op if the filter is inactive
pub fn process_mono_block(voice : &mut Voice, samples : &mut [i32]) {
    if !voice.filter_active() {
	return;
    }
    for s in samples.iter_mut() {
	*s = process(voice, 0, *s);
    }
}

/// Filter a block of interleaved stereo voice samples in place
pub fn process_stereo_block(voice : &mut Voice, samples : &mut [i32]) {
    if !voice.filter_active() {
	return;
    }
    for frame in samples.chunks_exact_mut(2) {
	frame[0] = process(voice, 0, frame[0]);
	frame[1] = process(voice, 1, frame[1]);
    }
}
