// Copyright (C) 2022 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

// DSP chain, in the order the render loop runs it:
// accumulator setup, (voice mixing), noise reduction, equalizer, master gain, clip

pub mod mixbuf;
pub mod offset;
pub mod filter;
pub mod noise;
pub mod equalizer;
pub mod normalize;
pub mod clip;
pub mod vumeter;
