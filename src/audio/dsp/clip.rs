// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Clip the accumulator and convert it to output PCM

use std::fmt::Display;

use crate::audio::{MixError, MIXING_ATTENUATION, MIXING_CLIPMAX, MIXING_CLIPMIN};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    /// Packed 24 bit (three bytes per sample, as in .wav), not 24-in-32
    S24,
    S32,
}

impl SampleFormat {
    pub fn from_bits(bits : u32) -> Result<SampleFormat, MixError> {
	return match bits {
	    8  => Ok(SampleFormat::U8),
	    16 => Ok(SampleFormat::S16),
	    24 => Ok(SampleFormat::S24),
	    32 => Ok(SampleFormat::S32),
	    _  => Err(MixError::UnsupportedBits(bits)),
	};
    }

    pub fn bits(&self) -> u32 {
	return self.bytes_per_sample() as u32 * 8;
    }

    pub fn bytes_per_sample(&self) -> usize {
	return match self {
	    SampleFormat::U8  => 1,
	    SampleFormat::S16 => 2,
	    SampleFormat::S24 => 3,
	    SampleFormat::S32 => 4,
	};
    }

    /// Byte value of digital silence
    pub fn silence(&self) -> u8 {
	return match self {
	    SampleFormat::U8 => 0x80,
	    _                => 0,
	};
    }
}

impl Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
	let name = match self {
	    SampleFormat::U8  => "u8",
	    SampleFormat::S16 => "s16",
	    SampleFormat::S24 => "s24",
	    SampleFormat::S32 => "s32",
	};
	write!(f, "{name}")
    }
}

// ================================================================================
// Level statistics

/// Extremes of the clamped accumulator, in the internal 27 bit range.
/// Index 0 collects even slots (left), index 1 odd slots (right).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipStats {
    pub mins : [i32; 2],
    pub maxs : [i32; 2],
}

impl ClipStats {
    /// Empty range: any sample will update both bounds
    pub fn new() -> ClipStats {
	return ClipStats {
	    mins : [i32::MAX; 2],
	    maxs : [-i32::MAX; 2],
	};
    }

    #[inline]
    fn record(&mut self, index : usize, n : i32) {
	let side = index & 1;
	if n < self.mins[side] {
	    self.mins[side] = n;
	}
	if n > self.maxs[side] {
	    self.maxs[side] = n;
	}
    }
}

impl Default for ClipStats {
    fn default() -> Self {
	ClipStats::new()
    }
}

// ================================================================================
// Conversion

/// Convert SAMPLES accumulator slots into OUT using FORMAT.
///
/// Every value is clamped to MIXING_CLIPMIN..=MIXING_CLIPMAX and recorded in STATS
/// before it is shifted to the output width.  Returns the number of bytes written.
pub fn convert(format : SampleFormat, out : &mut [u8], accumulator : &[i32], samples : usize, stats : &mut ClipStats) -> usize {
    let width = format.bytes_per_sample();
    let samples = usize::min(samples, usize::min(accumulator.len(), out.len() / width));

    for (i, (src, dest)) in accumulator[..samples].iter().zip(out.chunks_exact_mut(width)).enumerate() {
	let n = i32::clamp(*src, MIXING_CLIPMIN, MIXING_CLIPMAX);
	stats.record(i, n);

	match format {
	    SampleFormat::U8 => {
		dest[0] = ((n >> (24 - MIXING_ATTENUATION)) as u8) ^ 0x80;
	    }
	    SampleFormat::S16 => {
		let v = (n >> (16 - MIXING_ATTENUATION)) as i16;
		dest.copy_from_slice(&v.to_ne_bytes());
	    }
	    SampleFormat::S24 => {
		let v = n >> (8 - MIXING_ATTENUATION);
		if cfg!(target_endian = "little") {
		    dest.copy_from_slice(&v.to_le_bytes()[..3]);
		} else {
		    dest.copy_from_slice(&v.to_be_bytes()[1..]);
		}
	    }
	    SampleFormat::S32 => {
		let v = n << MIXING_ATTENUATION;
		dest.copy_from_slice(&v.to_ne_bytes());
	    }
	}
    }

    return samples * width;
}

pub fn to_u8(out : &mut [u8], accumulator : &[i32], samples : usize, stats : &mut ClipStats) -> usize {
    return convert(SampleFormat::U8, out, accumulator, samples, stats);
}

pub fn to_s16(out : &mut [u8], accumulator : &[i32], samples : usize, stats : &mut ClipStats) -> usize {
    return convert(SampleFormat::S16, out, accumulator, samples, stats);
}

pub fn to_s24(out : &mut [u8], accumulator : &[i32], samples : usize, stats : &mut ClipStats) -> usize {
    return convert(SampleFormat::S24, out, accumulator, samples, stats);
}

pub fn to_s32(out : &mut [u8], accumulator : &[i32], samples : usize, stats : &mut ClipStats) -> usize {
    return convert(SampleFormat::S32, out, accumulator, samples, stats);
}

#[cfg(test)]
mod test {
    use super::*;

    fn s16_values(bytes : &[u8]) -> Vec<i16> {
	return bytes.chunks_exact(2).map(|b| i16::from_ne_bytes([b[0], b[1]])).collect();
    }

    fn s24_value(b : &[u8]) -> i32 {
	let wide = if cfg!(target_endian = "little") {
	    i32::from_le_bytes([b[0], b[1], b[2], 0])
	} else {
	    i32::from_be_bytes([0, b[0], b[1], b[2]])
	};
	// sign-extend from 24 bits
	return (wide << 8) >> 8;
    }

    #[test]
    fn formats() {
	assert_eq!(SampleFormat::S24, SampleFormat::from_bits(24).unwrap());
	assert!(SampleFormat::from_bits(12).is_err());
	assert_eq!(3, SampleFormat::S24.bytes_per_sample());
	assert_eq!(32, SampleFormat::S32.bits());
	assert_eq!(0x80, SampleFormat::U8.silence());
	assert_eq!(0, SampleFormat::S16.silence());
	assert_eq!("s24", SampleFormat::S24.to_string());
    }

    #[test]
    fn s16_stereo_frame() {
	let acc = [1000000, -1000000];
	let mut out = [0u8; 4];
	let mut stats = ClipStats::new();
	assert_eq!(4, to_s16(&mut out, &acc, 2, &mut stats));
	assert_eq!(vec![488, -489], s16_values(&out));
	assert_eq!([1000000, -1000000], stats.mins);
	assert_eq!([1000000, -1000000], stats.maxs);
    }

    #[test]
    fn s16_stays_in_range_and_stats_bound() {
	let acc : Vec<i32> = (0..1000).map(|i : i32| i.wrapping_mul(0x3779_b97f)).collect();
	let mut out = vec![0u8; 2000];
	let mut stats = ClipStats::new();
	to_s16(&mut out, &acc, 1000, &mut stats);
	for (i, (v, a)) in s16_values(&out).iter().zip(acc.iter()).enumerate() {
	    let clamped = (*a).clamp(MIXING_CLIPMIN, MIXING_CLIPMAX);
	    assert!(stats.mins[i & 1] <= clamped && clamped <= stats.maxs[i & 1]);
	    // recover the accumulator value
	    let back = (*v as i32) << (16 - MIXING_ATTENUATION);
	    assert!(clamped - back >= 0 && clamped - back < 1 << (16 - MIXING_ATTENUATION));
	}
	assert_eq!([MIXING_CLIPMIN; 2], stats.mins);
	assert_eq!([MIXING_CLIPMAX; 2], stats.maxs);
	assert!(s16_values(&out).contains(&i16::MIN));
	assert!(s16_values(&out).contains(&i16::MAX));
    }

    #[test]
    fn u8_is_offset_binary() {
	let acc = [0, MIXING_CLIPMAX, MIXING_CLIPMIN, i32::MIN];
	let mut out = [0u8; 4];
	let mut stats = ClipStats::new();
	assert_eq!(4, to_u8(&mut out, &acc, 4, &mut stats));
	assert_eq!([0x80, 0xff, 0x00, 0x00], out);
    }

    #[test]
    fn s24_writes_three_bytes() {
	let acc = [1 << 20, -(1 << 20), MIXING_CLIPMAX, i32::MAX];
	let mut out = [0xaau8; 13];
	let mut stats = ClipStats::new();
	assert_eq!(12, to_s24(&mut out, &acc, 4, &mut stats));
	assert_eq!(1 << 17, s24_value(&out[0..3]));
	assert_eq!(-(1 << 17), s24_value(&out[3..6]));
	assert_eq!(0x7f_ffff, s24_value(&out[6..9]));
	assert_eq!(0x7f_ffff, s24_value(&out[9..12]));
	assert_eq!(0xaa, out[12]);
    }

    #[test]
    fn s32_scales_up() {
	let acc = [MIXING_CLIPMIN, 1];
	let mut out = [0u8; 8];
	let mut stats = ClipStats::new();
	assert_eq!(8, to_s32(&mut out, &acc, 2, &mut stats));
	assert_eq!(i32::MIN, i32::from_ne_bytes([out[0], out[1], out[2], out[3]]));
	assert_eq!(32, i32::from_ne_bytes([out[4], out[5], out[6], out[7]]));
    }

    #[test]
    fn short_output_is_not_overrun() {
	let acc = [1, 2, 3, 4];
	let mut out = [0u8; 5];
	let mut stats = ClipStats::new();
	assert_eq!(4, to_s16(&mut out, &acc, 4, &mut stats));
    }
}
