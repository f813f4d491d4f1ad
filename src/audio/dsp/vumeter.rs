// Copyright (C) 2022 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};

use std::{sync::{Arc, Mutex}, ops::DerefMut, collections::VecDeque, fmt::Display};

use super::clip::ClipStats;

const SPARKLINE : [char; 9] = ['-', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MAX_LEVEL : u32 = 0xff;
const MAX_LEN : usize = 128;
// 27 bit accumulator range down to 8 bit meter steps (with some headroom)
const VU_SHIFT : u32 = 18;

/// Peak-to-peak level per channel, 0..=255
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VuLevels {
    pub left : u32,
    pub right : u32,
}

impl VuLevels {
    pub fn from_stats(stats : &ClipStats) -> VuLevels {
	let level = |side : usize| {
	    let min = stats.mins[side] >> VU_SHIFT;
	    let max = i32::max(stats.maxs[side] >> VU_SHIFT, min);
	    return u32::min((max as i64 - min as i64) as u32, MAX_LEVEL);
	};
	return VuLevels {
	    left : level(0),
	    right : level(1),
	};
    }

    fn char(level : u32) -> char {
	let index = level as usize * (SPARKLINE.len() - 1) / MAX_LEVEL as usize;
	return SPARKLINE[usize::min(index, SPARKLINE.len() - 1)];
    }
}

// ================================================================================
// Cross-thread metering

/// Written by the audio thread after each period
#[derive(Clone)]
pub struct VuSensor {
    r : Arc<Mutex<VuLevels>>,
}

impl VuSensor {
    pub fn new() -> VuSensor { VuSensor { r : Arc::new(Mutex::new(VuLevels::default())) } }

    pub fn set(&self, levels : VuLevels) {
	if let Ok(mut guard) = self.r.lock() {
	    *guard.deref_mut() = levels;
	}
    }

    pub fn get(&self) -> VuLevels {
	return match self.r.lock() {
	    Ok(guard) => *guard,
	    Err(_)    => VuLevels::default(),
	};
    }
}

impl Default for VuSensor {
    fn default() -> Self {
	VuSensor::new()
    }
}

/// Level history for display
pub struct VuHistory {
    name : String,
    sensor : VuSensor,
    histogram : VecDeque<VuLevels>,
}

impl VuHistory {
    pub fn new(name : String) -> VuHistory {
	return VuHistory {
	    name,
	    sensor : VuSensor::new(),
	    histogram : VecDeque::new(),
	};
    }

    pub fn sensor(&self) -> VuSensor {
	return self.sensor.clone();
    }

    /// Replace the sensor (if the sensor must be created in the audio thread)
    pub fn replace_sensor(&mut self, new_sensor : VuSensor) {
	self.sensor = new_sensor;
    }

    pub fn len(&self) -> usize {
	return self.histogram.len();
    }

    /// Sample the sensor into the history
    pub fn shift(&mut self) {
	self.histogram.push_front(self.sensor.get());
	if self.histogram.len() > MAX_LEN {
	    self.histogram.pop_back();
	}
    }
}

impl Display for VuHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
	let mut l = "".to_string();
	let mut r = "".to_string();
	for d in self.histogram.iter() {
	    l.push(VuLevels::char(d.left));
	    r.push(VuLevels::char(d.right));
	}
	write!(f, "{:12} L[{l}] R[{r}]", self.name)
    }
}
