// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Mixing accumulator management
///
/// The accumulator holds interleaved i32 partial sums, `[L0, R0, L1, R1, ...]` in stereo.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};
#[allow(unused)]
use crate::{ptrace, pdebug, pinfo, pwarn, perror};

use std::iter::StepBy;
use std::slice::IterMut;

use crate::util::decay_step;

// ================================================================================
// Interleaved view

/// Stride view over an interleaved buffer: slot `frame * channels + channel`
pub struct Interleaved<'a> {
    data : &'a mut [i32],
    channels : usize,
}

impl<'a> Interleaved<'a> {
    pub fn new(data : &'a mut [i32], channels : usize) -> Interleaved<'a> {
	let channels = usize::max(1, channels);
	return Interleaved { data, channels };
    }

    pub fn channels(&self) -> usize {
	return self.channels;
    }

    pub fn frames(&self) -> usize {
	return self.data.len() / self.channels;
    }

    pub fn get(&self, frame : usize, channel : usize) -> i32 {
	return self.data[frame * self.channels + channel];
    }

    pub fn set(&mut self, frame : usize, channel : usize, v : i32) {
	self.data[frame * self.channels + channel] = v;
    }

    pub fn add(&mut self, frame : usize, channel : usize, v : i32) {
	let slot = &mut self.data[frame * self.channels + channel];
	*slot = slot.wrapping_add(v);
    }

    /// All slots of one channel, in frame order
    pub fn channel_mut(&mut self, channel : usize) -> StepBy<IterMut<'_, i32>> {
	let start = usize::min(channel, self.data.len());
	return self.data[start..].iter_mut().step_by(self.channels);
    }
}

// ================================================================================
// Buffer operations

/// Zero the first `samples` slots.  For stereo, the caller passes frames * 2.
pub fn clear(buffer : &mut [i32], samples : usize) {
    buffer[..samples].fill(0);
}

/// Start a stereo buffer from a decaying offset
///
/// Writes (not adds) `frames` stereo frames: each frame receives the decay step of
/// the right and left offsets.  Both offsets are updated in place.
pub fn fill_stereo_with_decay(buffer : &mut [i32], frames : usize, rofs : &mut i32, lofs : &mut i32) {
    if *rofs == 0 && *lofs == 0 {
	clear(buffer, frames * 2);
	return;
    }

    let mut r = *rofs;
    let mut l = *lofs;
    let mut view = Interleaved::new(&mut buffer[..frames * 2], 2);
    for frame in 0..frames {
	let x_r = decay_step(r);
	let x_l = decay_step(l);
	r -= x_r;
	l -= x_l;
	view.set(frame, 0, x_r);
	view.set(frame, 1, x_l);
    }
    ptrace!("[mixbuf] decayed fill: {} -> {r}, {} -> {l}", *rofs, *lofs);
    *rofs = r;
    *lofs = l;
}

/// Fold `frames` stereo frames into mono, in place, from the front
pub fn mono_from_stereo(buffer : &mut [i32], frames : usize) {
    for i in 0..frames {
	let j = i << 1;
	buffer[i] = buffer[j].wrapping_add(buffer[j + 1]) >> 1;
    }
}
