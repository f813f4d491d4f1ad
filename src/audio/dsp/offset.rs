// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Click removal: fade out a voice's residual DC offset

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};
#[allow(unused)]
use crate::{ptrace, pdebug, pinfo, pwarn, perror};

use crate::audio::voice::Voice;
use crate::util::decay_step;
use super::mixbuf::Interleaved;

/// Offsets not owned by any voice (voices that stopped before their tail finished)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DryOffset {
    pub rofs : i32,
    pub lofs : i32,
}

impl DryOffset {
    pub fn new() -> DryOffset {
	return DryOffset::default();
    }

    pub fn reset(&mut self) {
	*self = DryOffset::default();
    }
}

/// Add the decaying offset tail of VOICE to `frames` stereo frames of BUFFER
pub fn apply_trailing_offset(voice : &mut Voice, buffer : &mut [i32], frames : usize) {
    let mut rofs = voice.rofs;
    let mut lofs = voice.lofs;

    if rofs == 0 && lofs == 0 {
	return;
    }

    let mut view = Interleaved::new(&mut buffer[..frames * 2], 2);
    for frame in 0..frames {
	let x_r = decay_step(rofs);
	let x_l = decay_step(lofs);
	rofs -= x_r;
	lofs -= x_l;
	view.add(frame, 0, x_r);
	view.add(frame, 1, x_l);
    }

    voice.rofs = rofs;
    voice.lofs = lofs;
}

/// A voice stopped: fade what we can inside this buffer, hand the rest to DRY
pub fn retire_offset(voice : &mut Voice, buffer : &mut [i32], frames : usize, dry : &mut DryOffset) {
    apply_trailing_offset(voice, buffer, frames);
    dry.rofs = dry.rofs.wrapping_add(voice.rofs);
    dry.lofs = dry.lofs.wrapping_add(voice.lofs);
    ptrace!("[offset] retired voice, dry offset now ({}, {})", dry.rofs, dry.lofs);
    voice.rofs = 0;
    voice.lofs = 0;
}

#[cfg(test)]
mod test {
    use super::*;

    fn voice_with(rofs : i32, lofs : i32) -> Voice {
	let mut v = Voice::new();
	v.rofs = rofs;
	v.lofs = lofs;
	return v;
    }

    #[test]
    fn zero_offset_leaves_buffer_alone() {
	let mut buf : Vec<i32> = (0..128).map(|x| x * 31 - 1000).collect();
	let before = buf.clone();
	let mut v = voice_with(0, 0);
	apply_trailing_offset(&mut v, &mut buf, 64);
	assert_eq!(before, buf);
	assert_eq!(voice_with(0, 0), v);
    }

    #[test]
    fn tail_is_added() {
	let mut buf = vec![100; 4];
	let mut v = voice_with(512, -512);
	apply_trailing_offset(&mut v, &mut buf, 2);
	assert_eq!(vec![102, 98, 102, 98], buf);
	assert_eq!((508, -508), v.offsets());
    }

    fn buffers_until_silent(start : i32) -> usize {
	let mut v = voice_with(start, -start);
	let mut buf = vec![0; 128];
	let mut calls = 0;
	while v.has_offset() {
	    buf.fill(0);
	    apply_trailing_offset(&mut v, &mut buf, 64);
	    calls += 1;
	    assert!(calls <= 64, "offset {start} still at {:?} after {calls} buffers", v.offsets());
	}
	return calls;
    }

    #[test]
    fn converges_in_bounded_buffers() {
	// 1673 frames from +-100000, 3336 frames from +-2^26
	assert_eq!(27, buffers_until_silent(100000));
	assert_eq!(27, buffers_until_silent(-100000));
	assert_eq!(53, buffers_until_silent(1 << 26));
	assert_eq!(53, buffers_until_silent(-(1 << 26)));
	assert_eq!(1, buffers_until_silent(1));
	assert_eq!(1, buffers_until_silent(-1));
    }

    #[test]
    fn decay_never_overshoots() {
	let mut v = voice_with(100000, -100000);
	let mut buf = vec![0; 2 * 4096];
	apply_trailing_offset(&mut v, &mut buf, 4096);
	let sum_r : i64 = buf.iter().step_by(2).map(|x| *x as i64).sum();
	let sum_l : i64 = buf.iter().skip(1).step_by(2).map(|x| *x as i64).sum();
	assert_eq!(100000 - v.rofs as i64, sum_r);
	assert_eq!(-100000 - v.lofs as i64, sum_l);
	assert!(v.rofs >= 0);
	assert!(v.lofs <= 0);
    }

    #[test]
    fn retire_moves_remainder_to_dry() {
	let mut v = voice_with(100000, 0);
	let mut dry = DryOffset { rofs : 5, lofs : 0 };
	let mut buf = vec![0; 8];
	retire_offset(&mut v, &mut buf, 4, &mut dry);
	assert_eq!((0, 0), v.offsets());
	let added : i32 = buf.iter().step_by(2).sum();
	assert_eq!(100000 + 5, dry.rofs + added);
	assert_eq!(0, dry.lofs);
    }
}
