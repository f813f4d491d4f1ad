// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};
#[allow(unused)]
use crate::{ptrace, pdebug, pinfo, pwarn, perror};

/// Graphic equalizer
///
/// MAX_EQ_BANDS peaking bands per side.  Bands run as a cascade in index order: band n
/// filters the output of band n-1.  Left bands process even accumulator slots, right
/// bands (index + MAX_EQ_BANDS) the odd ones.

use std::f32::consts::PI;

use crate::audio::MAX_EQ_BANDS;

const EQ_BANDWIDTH : f32 = 2.0;
// Bands at or above this fraction of the sample rate are forced flat
const EQ_MAX_RELATIVE_FREQ : f32 = 0.45;
// Bands at or below this frequency (Hz) stay disabled
const EQ_MIN_FREQ : f32 = 20.0;

pub const DEFAULT_CENTER_FREQUENCIES : [f32; MAX_EQ_BANDS] = [120.0, 600.0, 1200.0, 3000.0, 6000.0, 10000.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EqBand {
    pub a0 : f32,
    pub a1 : f32,
    pub a2 : f32,
    pub b1 : f32,
    pub b2 : f32,
    pub x1 : f32,
    pub x2 : f32,
    pub y1 : f32,
    pub y2 : f32,
    pub gain : f32,
    pub center_frequency : f32,
    pub enabled : bool,
}

impl EqBand {
    fn flat(center_frequency : f32) -> EqBand {
	return EqBand {
	    a0 : 0.0, a1 : 0.0, a2 : 0.0, b1 : 0.0, b2 : 0.0,
	    x1 : 0.0, x2 : 0.0, y1 : 0.0, y2 : 0.0,
	    gain : 1.0,
	    center_frequency,
	    enabled : false,
	};
    }

    fn clear_history(&mut self) {
	self.x1 = 0.0;
	self.x2 = 0.0;
	self.y1 = 0.0;
	self.y2 = 0.0;
    }

    /// Bands that would not change the signal are skipped entirely
    pub fn is_active(&self) -> bool {
	return self.enabled && self.gain != 1.0;
    }

    /// Run the band over every STRIDE-th sample of BUFFER
    fn filter(&mut self, buffer : &mut [i32], stride : usize) {
	for s in buffer.iter_mut().step_by(stride) {
	    let x = *s as f32;
	    let y = self.a1 * self.x1
		+ self.a2 * self.x2
		+ self.a0 * x
		+ self.b1 * self.y1
		+ self.b2 * self.y2;

	    self.x2 = self.x1;
	    self.y2 = self.y1;
	    self.x1 = x;
	    *s = y as i32;
	    self.y1 = y;
	}
    }

    /// Recompute the coefficients; returns true if any of them changed
    fn update_coefficients(&mut self, sample_rate : f32) -> bool {
	let f = self.center_frequency / sample_rate;
	if f > EQ_MAX_RELATIVE_FREQ {
	    self.gain = 1.0;
	}

	// cheap approximation of tan(PI * f)
	let k = f * PI;
	let k = k + k * f;
	let k2 = k * k;

	let (v0, v1) = if self.gain < 1.0 {
	    (self.gain * 0.5 / EQ_BANDWIDTH, 0.5 / EQ_BANDWIDTH)
	} else {
	    (self.gain / EQ_BANDWIDTH, 1.0 / EQ_BANDWIDTH)
	};
	let norm = 1.0 + v1 * k + k2;

	let coefficients = [
	    (1.0 + v0 * k + k2) / norm,
	    2.0 * (k2 - 1.0) / norm,
	    (1.0 - v0 * k + k2) / norm,
	    -2.0 * (k2 - 1.0) / norm,
	    -(1.0 - v1 * k + k2) / norm,
	];

	let mut changed = false;
	let slots = [&mut self.a0, &mut self.a1, &mut self.a2, &mut self.b1, &mut self.b2];
	for (slot, r) in slots.into_iter().zip(coefficients) {
	    if *slot != r {
		*slot = r;
		changed = true;
	    }
	}
	return changed;
    }
}

// ================================================================================
// Equalizer

#[derive(Clone, Debug)]
pub struct Equalizer {
    bands : [EqBand; MAX_EQ_BANDS * 2],
}

impl Equalizer {
    pub fn new() -> Equalizer {
	let bands = std::array::from_fn(|i| EqBand::flat(DEFAULT_CENTER_FREQUENCIES[i % MAX_EQ_BANDS]));
	return Equalizer { bands };
    }

    pub fn bands(&self) -> &[EqBand] {
	return &self.bands;
    }

    /// Set band gains and center frequencies, then recompute all coefficients
    ///
    /// GAINS[i] maps to a factor of 1 + GAINS[i] / 64.  Only the first NUM_GAINS bands
    /// with a frequency above 20 Hz are enabled; without FREQUENCIES every band is off.
    pub fn set_gains(&mut self, gains : &[u32], num_gains : usize, frequencies : Option<&[u32]>,
		     reset : bool, sample_rate : u32) {
	for i in 0..MAX_EQ_BANDS {
	    let mut g = 1.0;
	    let mut f = 0.0;

	    if i < num_gains {
		if let Some(&n) = gains.get(i) {
		    g = (1.0 + n as f64 / 64.0) as f32;
		}
		if let Some(&freq) = frequencies.and_then(|fr| fr.get(i)) {
		    f = freq as i32 as f32;
		}
	    }

	    let enabled = f > EQ_MIN_FREQ && i < num_gains;
	    for band in [i, i + MAX_EQ_BANDS] {
		let b = &mut self.bands[band];
		b.gain = g;
		b.center_frequency = f;
		b.enabled = enabled;
	    }
	}
	pdebug!("[eq] gains {:?} (of {num_gains}) at {:?}", gains, frequencies);

	self.recompute_coefficients(reset, sample_rate);
    }

    /// Recompute every band for SAMPLE_RATE; disabled bands are zeroed
    pub fn recompute_coefficients(&mut self, reset : bool, sample_rate : u32) {
	let rate = sample_rate as f32;
	for band in self.bands.iter_mut() {
	    if !band.enabled {
		*band = EqBand {
		    gain : band.gain,
		    center_frequency : band.center_frequency,
		    ..EqBand::flat(0.0)
		};
		continue;
	    }

	    // one changed coefficient resets the whole history
	    let changed = band.update_coefficients(rate);
	    if reset || changed {
		band.clear_history();
	    }
	}
    }

    pub fn apply_mono(&mut self, buffer : &mut [i32], samples : usize) {
	let buffer = &mut buffer[..samples];
	for band in self.bands[..MAX_EQ_BANDS].iter_mut() {
	    if band.is_active() {
		band.filter(buffer, 1);
	    }
	}
    }

    /// Left bands on even slots, right bands on odd slots, of FRAMES stereo frames
    pub fn apply_stereo(&mut self, buffer : &mut [i32], frames : usize) {
	let buffer = &mut buffer[..frames * 2];
	let (left, right) = self.bands.split_at_mut(MAX_EQ_BANDS);
	for (lband, rband) in left.iter_mut().zip(right.iter_mut()) {
	    if lband.is_active() {
		lband.filter(buffer, 2);
	    }
	    if rband.is_active() {
		if let Some(odd) = buffer.get_mut(1..) {
		    rband.filter(odd, 2);
		}
	    }
	}
    }
}

impl Default for Equalizer {
    fn default() -> Self {
	Equalizer::new()
    }
}

// ================================================================================
// User-facing settings

/// Number of bands exposed to the user
pub const USER_EQ_BANDS : usize = 4;

/// EQ as configured by the user: gains 0..=64 and frequency positions 0..=127
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EqSettings {
    pub gains : [u32; USER_EQ_BANDS],
    pub freqs : [u32; USER_EQ_BANDS],
}

impl EqSettings {
    /// Center frequency in Hz of each user band at SAMPLE_RATE
    pub fn band_frequencies(&self, sample_rate : u32) -> [u32; USER_EQ_BANDS] {
	let mut out = [0; USER_EQ_BANDS];
	for (i, f) in out.iter_mut().enumerate() {
	    let pos = (i as u64 * 128) * self.freqs[i] as u64;
	    *f = (120 + pos * (sample_rate as u64 / 128) / 1024) as u32;
	}
	return out;
    }

    pub fn apply(&self, eq : &mut Equalizer, reset : bool, sample_rate : u32) {
	let freqs = self.band_frequencies(sample_rate);
	eq.set_gains(&self.gains, USER_EQ_BANDS, Some(&freqs), reset, sample_rate);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use rustfft::{FftPlanner, num_complex::Complex};

    #[test]
    fn defaults_are_flat_and_disabled() {
	let eq = Equalizer::new();
	for (i, b) in eq.bands().iter().enumerate() {
	    assert!(!b.enabled);
	    assert_eq!(1.0, b.gain);
	    assert_eq!(DEFAULT_CENTER_FREQUENCIES[i % MAX_EQ_BANDS], b.center_frequency);
	}
    }

    #[test]
    fn no_gains_is_identity() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[], 0, None, true, 44100);
	let original : Vec<i32> = (0..512).map(|i| (i * 7919 % 20001) - 10000).collect();

	let mut mono = original.clone();
	eq.apply_mono(&mut mono, 512);
	assert_eq!(original, mono);

	let mut stereo = original.clone();
	eq.apply_stereo(&mut stereo, 256);
	assert_eq!(original, stereo);

	for b in eq.bands() {
	    assert!(!b.enabled);
	    assert_eq!(0.0, b.center_frequency);
	    assert_eq!(0.0, b.a0);
	}
    }

    #[test]
    fn set_gains_enables_only_audible_bands() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[32, 16, 0], 3, Some(&[1000, 10, 5000, 6000]), false, 44100);
	let b = eq.bands();
	assert!(b[0].enabled && b[MAX_EQ_BANDS].enabled);
	assert_eq!(1.5, b[0].gain);
	assert_eq!(1000.0, b[MAX_EQ_BANDS].center_frequency);
	// 10 Hz: below the audible floor
	assert!(!b[1].enabled);
	assert_eq!(1.25, b[1].gain);
	// enabled, but unity gain is never applied
	assert!(b[2].enabled);
	assert!(!b[2].is_active());
	// beyond num_gains
	assert!(!b[3].enabled);
	assert_eq!(1.0, b[3].gain);
	assert_eq!(0.0, b[3].center_frequency);
    }

    #[test]
    fn near_nyquist_is_forced_flat() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[64], 1, Some(&[20000]), false, 44100);
	assert_eq!(1.0, eq.bands()[0].gain);
	assert!(!eq.bands()[0].is_active());
    }

    #[test]
    fn coefficient_change_resets_history() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[32], 1, Some(&[1000]), false, 44100);
	let mut buf = vec![10000, 0, -10000, 0];
	eq.apply_mono(&mut buf, 4);
	assert!(eq.bands()[0].x1 != 0.0 || eq.bands()[0].y1 != 0.0);

	// unchanged coefficients, no reset: history survives
	eq.recompute_coefficients(false, 44100);
	assert!(eq.bands()[0].x1 != 0.0 || eq.bands()[0].y1 != 0.0);

	// new sample rate: every coefficient moves, history goes
	eq.recompute_coefficients(false, 48000);
	assert_eq!(0.0, eq.bands()[0].x1);
	assert_eq!(0.0, eq.bands()[0].y2);
    }

    fn impulse_response(eq : &mut Equalizer, len : usize) -> Vec<i32> {
	let mut buf = vec![0; len];
	buf[0] = 1 << 20;
	eq.apply_mono(&mut buf, len);
	return buf;
    }

    #[test]
    fn boost_peaks_at_center() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[32], 1, Some(&[1000]), true, 44100);
	let b = eq.bands()[0];
	assert!(b.enabled);
	assert_relative_eq!(1.5, b.gain);

	const N : usize = 4096;
	let ir = impulse_response(&mut eq, N);
	assert!(ir[1..].iter().any(|x| *x != 0));

	let mut spectrum : Vec<Complex<f32>> = ir.iter().map(|x| Complex::new(*x as f32 / (1 << 20) as f32, 0.0)).collect();
	FftPlanner::<f32>::new().plan_fft_forward(N).process(&mut spectrum);
	let magnitude = |hz : f32| spectrum[(hz * N as f32 / 44100.0).round() as usize].norm();

	let low = magnitude(20.0);
	let center = magnitude(1000.0);
	let high = magnitude(15000.0);
	assert_relative_eq!(1.0, low, epsilon = 0.05);
	assert_relative_eq!(1.0, high, epsilon = 0.1);
	assert!(center > 1.3, "center gain {center}");
	// the peak sits close to the requested center
	let peak_bin = (1..N / 2).max_by(|a, b| spectrum[*a].norm().total_cmp(&spectrum[*b].norm())).unwrap_or(0);
	let peak_hz = peak_bin as f32 * 44100.0 / N as f32;
	assert!(peak_hz > 700.0 && peak_hz < 1400.0, "peak at {peak_hz} Hz");
    }

    #[test]
    fn stereo_bands_split_channels() {
	let mut eq = Equalizer::new();
	eq.set_gains(&[32], 1, Some(&[1000]), true, 44100);
	let mut mono = impulse_response(&mut eq, 64);

	let mut eq = Equalizer::new();
	eq.set_gains(&[32], 1, Some(&[1000]), true, 44100);
	let mut stereo = vec![0; 128];
	stereo[0] = 1 << 20;
	stereo[1] = 1 << 20;
	eq.apply_stereo(&mut stereo, 64);

	let left : Vec<i32> = stereo.iter().step_by(2).copied().collect();
	let right : Vec<i32> = stereo.iter().skip(1).step_by(2).copied().collect();
	mono.truncate(64);
	assert_eq!(mono, left);
	assert_eq!(mono, right);
    }

    #[test]
    fn user_band_frequencies() {
	let s = EqSettings { gains : [0; 4], freqs : [0, 64, 127, 10] };
	// 120 + i * 128 * freq * (rate / 128) / 1024
	let expected : [u32; 4] = [120, 120 + (128 * 64 * 344) / 1024, 120 + (256 * 127 * 344) / 1024, 120 + (384 * 10 * 344) / 1024];
	assert_eq!(expected, s.band_frequencies(44100));

	let mut eq = Equalizer::new();
	let s = EqSettings { gains : [16, 0, 0, 0], freqs : [0; 4] };
	s.apply(&mut eq, true, 44100);
	assert!(eq.bands()[0].enabled);
	assert_eq!(120.0, eq.bands()[0].center_frequency);
	assert!(!eq.bands()[4].enabled);
    }
}
