// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

/// Per-voice state that the mixing core reads and updates.
///
/// Everything else about a voice (sample data, position, envelopes, effect memory)
/// belongs to the song player and never reaches this crate.

// Voice flags; values follow the tracker's channel flag layout
pub const FILTER : u32   = 0x0000_4000; // resonant filter active
pub const NEW_NOTE : u32 = 0x0200_0000; // note was (re)triggered on this tick

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Voice {
    pub flags : u32,

    // Filter parameters, 0..=255 (larger values are clamped when configuring)
    pub cutoff : u32,
    pub resonance : u32,

    // Fixed-point filter coefficients, FILTER_PRECISION fractional bits
    pub filter_a0 : i32,
    pub filter_b0 : i32,
    pub filter_b1 : i32,
    /// Filter history: [side][tap]
    pub filter_y : [[i32; 2]; 2],

    // Residual DC offsets still to be faded out
    pub rofs : i32,
    pub lofs : i32,
}

impl Voice {
    pub fn new() -> Voice {
	return Voice::default();
    }

    pub fn has_flag(&self, flag : u32) -> bool {
	return self.flags & flag != 0;
    }

    pub fn set_flag(&mut self, flag : u32) {
	self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag : u32) {
	self.flags &= !flag;
    }

    pub fn filter_active(&self) -> bool {
	return self.has_flag(FILTER);
    }

    /// Remaining offset (right, left)
    pub fn offsets(&self) -> (i32, i32) {
	return (self.rofs, self.lofs);
    }

    pub fn has_offset(&self) -> bool {
	return self.rofs != 0 || self.lofs != 0;
    }
}
