// Copyright (C) 2024 Christoph Reichenbach (creichen@gmail.com)
// Licenced under the GNU General Public Licence, v3.  Please refer to the file "COPYING" for details.

#[allow(unused)]
use log::{Level, log_enabled, trace, debug, info, warn, error};

use std::path::Path;

use trackmix::audio::{EqSettings, MixError, MixerConfig, MixerContext, SampleFormat, VoiceMixer, MIX_EQ, MIX_NOISE_REDUCTION};
use trackmix::audio::dsp::equalizer::USER_EQ_BANDS;
use trackmix::audio::dsp::vumeter::VuHistory;

use clap::Parser;
mod cli;
mod song;

use song::DemoSong;

fn config_from_cli(cli : &cli::Cli) -> Result<MixerConfig, MixError> {
    let mut config = MixerConfig::new(cli.rate, cli.channels, cli.bits)?;
    config.master_left = cli.master;
    config.master_right = cli.master;
    if cli.nr {
	config.flags |= MIX_NOISE_REDUCTION;
    }
    if !cli.eq.is_empty() {
	config.flags |= MIX_EQ;
	let mut eq = EqSettings::default();
	for i in 0..USER_EQ_BANDS {
	    eq.gains[i] = cli.eq.get(i).copied().unwrap_or(0).min(64);
	    eq.freqs[i] = cli.eq_freq.get(i).copied().unwrap_or(0).min(127);
	}
	config.eq = eq;
    }
    return Ok(config);
}

// ================================================================================
// WAV output

/// Decode one rendered sample back into the integer hound expects
fn write_sample<W : std::io::Write + std::io::Seek>(writer : &mut hound::WavWriter<W>, format : SampleFormat, b : &[u8]) -> Result<(), MixError> {
    match format {
	SampleFormat::U8  => writer.write_sample((b[0] ^ 0x80) as i8)?,
	SampleFormat::S16 => writer.write_sample(i16::from_ne_bytes([b[0], b[1]]))?,
	SampleFormat::S24 => {
	    let wide = if cfg!(target_endian = "little") {
		i32::from_le_bytes([b[0], b[1], b[2], 0])
	    } else {
		i32::from_be_bytes([0, b[0], b[1], b[2]])
	    };
	    writer.write_sample((wide << 8) >> 8)?
	}
	SampleFormat::S32 => writer.write_sample(i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))?,
    }
    return Ok(());
}

/// Render MIXER for at most MAX_FRAMES frames into a .wav file; returns the frames written
pub fn render_wav<M : VoiceMixer + ?Sized>(ctx : &mut MixerContext, mixer : &mut M, max_frames : usize, path : &Path) -> Result<usize, MixError> {
    let config = *ctx.config();
    let spec = hound::WavSpec {
	channels : config.channels as u16,
	sample_rate : config.sample_rate,
	bits_per_sample : config.format.bits() as u16,
	sample_format : hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut vu = VuHistory::new("output".to_string());
    let sensor = vu.sensor();

    // one tenth of a second per period
    let period = usize::max(1, config.sample_rate as usize / 10);
    let frame_bytes = ctx.frame_bytes();
    let mut buf = vec![0u8; period * frame_bytes];
    let width = config.format.bytes_per_sample();
    let mut total = 0;

    while total < max_frames {
	let frames = usize::min(period, max_frames - total);
	let rendered = ctx.read(mixer, &mut buf[..frames * frame_bytes]);
	for sample in buf[..rendered.bytes].chunks_exact(width) {
	    write_sample(&mut writer, config.format, sample)?;
	}
	total += rendered.frames;
	sensor.set(ctx.vu());
	vu.shift();
	if rendered.frames < frames {
	    break;
	}
    }
    writer.finalize()?;

    info!("{vu}");
    info!("Wrote {total} frames to {}", path.display());
    return Ok(total);
}

// ================================================================================
// Live playback

#[cfg(feature = "sdl")]
fn play(config : MixerConfig, song : DemoSong) -> Result<(), MixError> {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    let sdl_context = sdl2::init().map_err(MixError::Backend)?;
    let song = Arc::new(Mutex::new(song));
    let mut core = trackmix::audio::acore::init(&sdl_context, config, song.clone())?;
    let mut vu = VuHistory::new("sdl".to_string());
    vu.replace_sensor(core.vu_sensor());

    loop {
	std::thread::sleep(Duration::from_millis(100));
	vu.shift();
	let active = match song.lock() {
	    Ok(guard) => guard.active(),
	    Err(_)    => false,
	};
	if !active {
	    break;
	}
    }
    core.pause();
    info!("{vu}");
    return Ok(());
}

#[cfg(not(feature = "sdl"))]
fn play(_config : MixerConfig, _song : DemoSong) -> Result<(), MixError> {
    return Err(MixError::Backend("built without the `sdl` feature".to_string()));
}

fn main() -> Result<(), MixError> {
    env_logger::init();
    let cli = cli::Cli::parse();
    let config = config_from_cli(&cli)?;
    let mut song = DemoSong::builtin();

    if cli.play {
	return play(config, song);
    }

    let mut ctx = MixerContext::new(config);
    let max_frames = (cli.seconds.max(0.0) * ctx.config().sample_rate as f32) as usize;
    let frames = render_wav(&mut ctx, &mut song, max_frames, &cli.output)?;
    println!("{}: {frames} frames, {} Hz, {} channel(s), {}",
	     cli.output.display(), ctx.config().sample_rate, ctx.config().channels, ctx.config().format);
    return Ok(());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cli_maps_onto_config() {
	let cli = cli::Cli::parse_from(["trackmix-render", "-r", "22050", "-b", "24", "-c", "1", "--nr", "--eq", "64,32", "--eq-freq", "0,10"]);
	let config = config_from_cli(&cli).unwrap();
	assert_eq!(22050, config.sample_rate);
	assert_eq!(SampleFormat::S24, config.format);
	assert_eq!(1, config.channels);
	assert_eq!(MIX_EQ | MIX_NOISE_REDUCTION, config.flags);
	assert_eq!([64, 32, 0, 0], config.eq.gains);
	assert_eq!([0, 10, 0, 0], config.eq.freqs);

	let cli = cli::Cli::parse_from(["trackmix-render", "-b", "12"]);
	assert!(matches!(config_from_cli(&cli), Err(MixError::UnsupportedBits(12))));
    }

    #[test]
    fn renders_wav_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("out.wav");
	let mut ctx = MixerContext::new(MixerConfig::new(8000, 2, 16).unwrap());
	let mut song = DemoSong::builtin();
	let frames = render_wav(&mut ctx, &mut song, 8000, &path).unwrap();
	assert_eq!(8000, frames);

	let reader = hound::WavReader::open(&path).unwrap();
	assert_eq!(8000, reader.spec().sample_rate);
	assert_eq!(2, reader.spec().channels);
	assert_eq!(16, reader.spec().bits_per_sample);
	let samples : Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
	assert_eq!(16000, samples.len());
	assert!(samples.iter().any(|s| *s != 0));
    }

    #[test]
    fn renders_packed_24_bit() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("out24.wav");
	let mut ctx = MixerContext::new(MixerConfig::new(8000, 1, 24).unwrap());
	let mut song = DemoSong::builtin();
	assert_eq!(800, render_wav(&mut ctx, &mut song, 800, &path).unwrap());

	let reader = hound::WavReader::open(&path).unwrap();
	assert_eq!(24, reader.spec().bits_per_sample);
	let samples : Vec<i32> = reader.into_samples::<i32>().map(|s| s.unwrap()).collect();
	assert_eq!(800, samples.len());
	assert!(samples.iter().all(|s| *s >= -(1 << 23) && *s < 1 << 23));
	assert!(samples.iter().any(|s| *s != 0));
    }
}
