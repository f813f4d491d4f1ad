// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Noise reduction: a one-pole smoother averaging each sample with its predecessor

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoiseReduction {
    left : i32,
    right : i32,
}

impl NoiseReduction {
    pub fn new() -> NoiseReduction {
	return NoiseReduction::default();
    }

    pub fn reset(&mut self) {
	*self = NoiseReduction::default();
    }

    pub fn apply_stereo(&mut self, buffer : &mut [i32], frames : usize) {
	let mut n1 = self.left;
	let mut n2 = self.right;
	for frame in buffer[..frames * 2].chunks_exact_mut(2) {
	    let v = frame[0] >> 1;
	    frame[0] = v + n1;
	    n1 = v;
	    let v = frame[1] >> 1;
	    frame[1] = v + n2;
	    n2 = v;
	}
	self.left = n1;
	self.right = n2;
    }

    pub fn apply_mono(&mut self, buffer : &mut [i32], samples : usize) {
	let mut n = self.left;
	for s in buffer[..samples].iter_mut() {
	    let v = *s >> 1;
	    *s = v + n;
	    n = v;
	}
	self.left = n;
    }
}
