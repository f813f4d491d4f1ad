// Copyright (C) 2022 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

// General utilities

// Per-buffer logging from inside the render path is compiled out unless this is set
pub const LOGGING : bool = false;
pub const WARNING : bool = true;
pub const CARGO_TEST : bool = cfg!(test);

#[macro_export]
macro_rules! ptrace {
    ($($a:tt)*) => {
	if $crate::util::LOGGING {
	    if $crate::util::CARGO_TEST {
		println!($($a)*)
	    } else {
		trace!($($a)*)
	    }
	}
    }
}

#[macro_export]
macro_rules! pdebug {
    ($($a:tt)*) => {
	if $crate::util::LOGGING {
	    if $crate::util::CARGO_TEST {
		println!($($a)*)
	    } else {
		debug!($($a)*)
	    }
	}
    }
}

#[macro_export]
macro_rules! pinfo {
    ($($a:tt)*) => {
	if $crate::util::LOGGING {
	    if $crate::util::CARGO_TEST {
		println!($($a)*)
	    } else {
		info!($($a)*)
	    }
	}
    }
}

#[macro_export]
macro_rules! pwarn {
    ($($a:tt)*) => {
	if $crate::util::WARNING {
	    if $crate::util::CARGO_TEST {
		println!($($a)*)
	    } else {
		warn!($($a)*)
	    }
	}
    }
}

#[macro_export]
macro_rules! perror {
    ($($a:tt)*) => {
	if $crate::util::CARGO_TEST {
	    println!($($a)*)
	} else {
	    error!($($a)*)
	}
    }
}

/// (a * b) / c with a 64 bit intermediate; truncates towards zero.
#[inline]
pub fn muldiv(a : i32, b : i32, c : i32) -> i32 {
    return ((a as i64 * b as i64) / c as i64) as i32;
}

/// (a * b + c/2) / c with a 64 bit intermediate.
#[inline]
pub fn muldivr(a : i32, b : i32, c : i32) -> i32 {
    return ((a as i64 * b as i64 + (c >> 1) as i64) / c as i64) as i32;
}

/// Sign-correct decay step towards zero, 1/256 per call.
///
/// Positive offsets are biased by 0xff before the shift, so any nonzero offset moves by at least one.
#[inline]
pub fn decay_step(ofs : i32) -> i32 {
    const DECAY_SHIFT : u32 = 8;
    const DECAY_MASK : i32 = 0xff;
    return ofs.wrapping_add((ofs.wrapping_neg() >> 31) & DECAY_MASK) >> DECAY_SHIFT;
}
