// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};

use trackmix::audio::dsp::filter;
use trackmix::audio::voice::NEW_NOTE;
use trackmix::audio::{MixContext, Voice, VoiceMixer};

/// Built-in test song: square-wave voices with a per-note filter sweep.
///
/// Notes end abruptly so that click removal has something to do.

const TICKS_PER_SECOND : u32 = 50;
const NUM_VOICES : usize = 4;
// accumulator units per volume step (volume 0..=64)
const VOLUME_SCALE : i32 = 1 << 16;

#[derive(Clone, Copy, Debug)]
pub struct Note {
    /// Start and length in ticks
    pub start : u32,
    pub length : u32,
    pub voice : usize,
    pub frequency : f32,
    pub volume : i32,
    /// 0 = left, 64 = right
    pub pan : i32,
    pub cutoff : u32,
    pub resonance : u32,
    /// Cutoff modifier change per tick
    pub sweep : i32,
}

#[derive(Default)]
struct SquareVoice {
    voice : Voice,
    /// 16.16 fixed-point phase, one cycle per 1 << 16
    phase : u32,
    increment : u32,
    left : i32,
    right : i32,
    sweep : i32,
    modifier : i32,
    /// Frames until the note stops
    remaining : Option<usize>,
}

impl SquareVoice {
    fn start(&mut self, note : &Note, sample_rate : u32) {
	self.phase = 0;
	self.increment = ((note.frequency as f64 * 65536.0) / sample_rate as f64) as u32;
	let pan = note.pan.clamp(0, 64);
	self.left = note.volume * (64 - pan) / 64 * VOLUME_SCALE;
	self.right = note.volume * pan / 64 * VOLUME_SCALE;
	self.sweep = note.sweep;
	self.modifier = 0;
	self.voice.cutoff = note.cutoff;
	self.voice.resonance = note.resonance;
	self.voice.set_flag(NEW_NOTE);
	self.remaining = Some((note.length * sample_rate / TICKS_PER_SECOND) as usize);
    }

    fn tick(&mut self, sample_rate : u32) {
	if self.remaining.is_none() {
	    return;
	}
	let new_note = self.voice.has_flag(NEW_NOTE);
	filter::configure(&mut self.voice, new_note, self.modifier, sample_rate);
	self.voice.clear_flag(NEW_NOTE);
	self.modifier = (self.modifier + self.sweep).clamp(-256, 256);
    }

    /// Mix up to FRAMES frames into BUF; returns the number of frames played
    fn mix(&mut self, buf : &mut [i32], frames : usize) -> usize {
	let Some(remaining) = self.remaining else {
	    return 0;
	};
	let count = usize::min(frames, remaining);
	if count == 0 {
	    return 0;
	}

	let mut last = (0, 0);
	for frame in buf[..count * 2].chunks_exact_mut(2) {
	    let high = self.phase & 0x8000 == 0;
	    self.phase = self.phase.wrapping_add(self.increment);
	    let (mut l, mut r) = if high { (self.left, self.right) } else { (-self.left, -self.right) };
	    if self.voice.filter_active() {
		l = filter::process(&mut self.voice, 0, l);
		r = filter::process(&mut self.voice, 1, r);
	    }
	    frame[0] = frame[0].wrapping_add(l);
	    frame[1] = frame[1].wrapping_add(r);
	    last = (l, r);
	}
	// the offset is what this voice contributed to the last frame
	self.voice.rofs = last.0;
	self.voice.lofs = last.1;

	self.remaining = Some(remaining - count);
	return count;
    }
}

pub struct DemoSong {
    notes : Vec<Note>,
    next_note : usize,
    voices : [SquareVoice; NUM_VOICES],
    /// Frames until the next tick
    tick_countdown : usize,
    tick : u32,
    length : u32,
}

impl DemoSong {
    pub fn new(notes : Vec<Note>) -> DemoSong {
	let mut notes = notes;
	notes.sort_by_key(|n| n.start);
	let length = notes.iter().map(|n| n.start + n.length).max().unwrap_or(0);
	return DemoSong {
	    notes,
	    next_note : 0,
	    voices : Default::default(),
	    tick_countdown : 0,
	    tick : 0,
	    length,
	};
    }

    /// A short arpeggio over a bass line
    pub fn builtin() -> DemoSong {
	let mut notes = vec![];
	let bass = [55.0, 55.0, 43.65, 49.0];
	for (bar, f) in bass.iter().enumerate() {
	    notes.push(Note { start : bar as u32 * 100, length : 90, voice : 0, frequency : *f,
			      volume : 48, pan : 32, cutoff : 90, resonance : 80, sweep : 3 });
	}
	let arp = [220.0, 261.63, 329.63, 440.0, 329.63, 261.63];
	for step in 0..40 {
	    let f = arp[step % arp.len()];
	    let voice = 1 + step % 2;
	    notes.push(Note { start : step as u32 * 10, length : 8, voice, frequency : f,
			      volume : 24, pan : if voice == 1 { 16 } else { 48 },
			      cutoff : 200, resonance : 20, sweep : -12 });
	}
	notes.push(Note { start : 200, length : 200, voice : 3, frequency : 880.0,
			  volume : 12, pan : 64, cutoff : 255, resonance : 0, sweep : 0 });
	return DemoSong::new(notes);
    }

    fn do_tick(&mut self, ctx : &mut MixContext<'_>, acc : &mut [i32], frames : usize) {
	while let Some(note) = self.notes.get(self.next_note) {
	    if note.start > self.tick {
		break;
	    }
	    let note = *note;
	    self.next_note += 1;
	    if let Some(v) = self.voices.get_mut(note.voice) {
		if v.voice.has_offset() {
		    ctx.retire(&mut v.voice, acc, frames);
		}
		v.start(&note, ctx.sample_rate);
		trace!("tick {}: voice {} plays {:.1} Hz", self.tick, note.voice, note.frequency);
	    }
	}
	for v in self.voices.iter_mut() {
	    v.tick(ctx.sample_rate);
	}
	self.tick += 1;
    }

    /// Voices still playing, or notes still due
    pub fn active(&self) -> bool {
	return self.tick <= self.length
	    || self.voices.iter().any(|v| v.remaining.is_some());
    }
}

impl VoiceMixer for DemoSong {
    fn mix(&mut self, ctx : &mut MixContext<'_>, acc : &mut [i32], frames : usize) -> bool {
	if !self.active() {
	    return false;
	}

	let mut pos = 0;
	while pos < frames {
	    if self.tick_countdown == 0 {
		self.do_tick(ctx, &mut acc[pos * 2..], frames - pos);
		self.tick_countdown = usize::max(1, (ctx.sample_rate / TICKS_PER_SECOND) as usize);
	    }
	    let count = usize::min(self.tick_countdown, frames - pos);

	    for v in self.voices.iter_mut() {
		if v.remaining.is_none() {
		    continue;
		}
		let played = v.mix(&mut acc[pos * 2..(pos + count) * 2], count);
		if v.remaining == Some(0) {
		    v.remaining = None;
		    ctx.retire(&mut v.voice, &mut acc[(pos + played) * 2..], frames - pos - played);
		}
	    }

	    pos += count;
	    self.tick_countdown -= count;
	}
	return true;
    }
}
