// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Master gain
///
/// Master volumes are in 1/31 steps, so 31 leaves the signal unchanged.

use crate::util::muldiv;

pub const MASTER_UNITY : i32 = 31;

pub fn apply_mono(buffer : &mut [i32], samples : usize, master_left : i32, master_right : i32) {
    let gain = master_left + master_right;
    for s in buffer[..samples].iter_mut() {
	*s = muldiv(*s, gain, MASTER_UNITY * 2);
    }
}

pub fn apply_stereo(buffer : &mut [i32], frames : usize, master_left : i32, master_right : i32) {
    for frame in buffer[..frames * 2].chunks_exact_mut(2) {
	frame[0] = muldiv(frame[0], master_left, MASTER_UNITY);
	frame[1] = muldiv(frame[1], master_right, MASTER_UNITY);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::{MIXING_CLIPMAX, MIXING_CLIPMIN};

    #[test]
    fn unity_is_identity() {
	let mut buf = [MIXING_CLIPMAX, MIXING_CLIPMIN, 12345, -1];
	apply_stereo(&mut buf, 2, 31, 31);
	assert_eq!([MIXING_CLIPMAX, MIXING_CLIPMIN, 12345, -1], buf);
	apply_mono(&mut buf, 4, 31, 31);
	assert_eq!([MIXING_CLIPMAX, MIXING_CLIPMIN, 12345, -1], buf);
    }

    #[test]
    fn large_gain_does_not_overflow() {
	let mut buf = [MIXING_CLIPMAX, MIXING_CLIPMIN];
	apply_stereo(&mut buf, 1, 124, 0);
	assert_eq!([MIXING_CLIPMAX * 4, 0], buf);
    }

    #[test]
    fn channels_scale_independently() {
	let mut buf = [3100, 3100, -62, 62];
	apply_stereo(&mut buf, 2, 10, 0);
	assert_eq!([1000, 0, -20, 0], buf);

	let mut mono = [6200, -6200];
	apply_mono(&mut mono, 2, 31, 0);
	assert_eq!([3100, -3100], mono);
    }
}
