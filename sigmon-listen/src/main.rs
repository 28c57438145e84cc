// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The Sigmon command line monitor: feeds a raw signed 16-bit little-endian mono sample
//! stream (22,050 Hz) through the selected demodulators and prints one line per decoded
//! frame. Container files must be converted out-of-band, e.g.
//! `sox capture.wav -t raw -e signed -b 16 -r 22050 - | sigmon-listen -a POCSAG1200 -`.

use std::fs::File;
use std::io::Read;
use std::process::ExitCode;

use clap::{App, Arg};
use log::{error, info, LevelFilter};

use sigmon::core::demod::{
    DemodOptions, Demodulator, PocsagCharset, PocsagMessageMode,
};
use sigmon::core::fec::ErrorCorrection;
use sigmon::core::pipeline::Pipeline;
use sigmon::core::record::{ConsoleSink, JsonSink, RecordSink};

/// Exit code for a usage error.
const EXIT_USAGE: u8 = 2;
/// Exit code for a sample-rate mismatch between enabled demodulators.
const EXIT_RATE_MISMATCH: u8 = 3;
/// Exit code for an input read error.
const EXIT_READ_ERROR: u8 = 4;
/// Exit code for an input open error.
const EXIT_OPEN_ERROR: u8 = 10;

fn main() -> ExitCode {
    let matches = App::new("sigmon-listen")
        .version("0.3.0")
        .about("Monitor voice-band radio audio for digital transmissions")
        .arg(
            Arg::new("demod")
                .short('a')
                .long("demod")
                .value_name("NAME")
                .takes_value(true)
                .multiple_occurrences(true)
                .help("Enable a demodulator (repeatable); see --list"),
        )
        .arg(Arg::new("list").long("list").help("List available demodulators"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .multiple_occurrences(true)
                .help("Increase diagnostic verbosity"),
        )
        .arg(Arg::new("json").long("json").help("Emit one JSON object per record"))
        .arg(Arg::new("no-flush").long("no-flush").help("Do not flush stdout after every record"))
        .arg(
            Arg::new("pocsag-mode")
                .long("pocsag-mode")
                .value_name("MODE")
                .takes_value(true)
                .possible_values(["auto", "standard", "numeric", "alpha", "skyper"])
                .default_value("standard")
                .help("POCSAG message interpretation"),
        )
        .arg(
            Arg::new("error-correction")
                .short('e')
                .long("error-correction")
                .value_name("LEVEL")
                .takes_value(true)
                .possible_values(["0", "1", "2"])
                .default_value("2")
                .help("POCSAG BCH repair effort: 0 none, 1 single-bit, 2 two-bit"),
        )
        .arg(Arg::new("invert").short('i').long("invert").help("Invert POCSAG input polarity"))
        .arg(
            Arg::new("charset")
                .long("charset")
                .value_name("CS")
                .takes_value(true)
                .possible_values(["US", "DE", "SE", "FR", "SI"])
                .default_value("US")
                .help("POCSAG alphanumeric charset variant"),
        )
        .arg(Arg::new("show-partial").long("show-partial").help("Emit partial POCSAG decodes"))
        .arg(Arg::new("prune-empty").long("prune-empty").help("Drop empty POCSAG pages"))
        .arg(
            Arg::new("heuristic-prune")
                .long("heuristic-prune")
                .help("Drop POCSAG pages no rendering finds plausible"),
        )
        .arg(Arg::new("aprs").short('A').long("aprs").help("Render AX.25 UI frames as APRS"))
        .arg(
            Arg::new("morse-dit")
                .long("morse-dit")
                .value_name("MS")
                .takes_value(true)
                .default_value("50")
                .help("Morse dit duration in milliseconds"),
        )
        .arg(
            Arg::new("morse-gap")
                .long("morse-gap")
                .value_name("MS")
                .takes_value(true)
                .default_value("50")
                .help("Morse gap duration in milliseconds"),
        )
        .arg(
            Arg::new("morse-threshold")
                .long("morse-threshold")
                .value_name("LEVEL")
                .takes_value(true)
                .default_value("500")
                .help("Morse detection threshold"),
        )
        .arg(
            Arg::new("morse-manual-threshold")
                .long("morse-manual-threshold")
                .help("Disable the Morse auto threshold"),
        )
        .arg(
            Arg::new("morse-manual-timing")
                .long("morse-manual-timing")
                .help("Disable the Morse adaptive timing"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Raw s16le sample file, or - for standard input")
                .required_unless_present("list")
                .index(1),
        )
        .get_matches();

    // -v maps onto the log facade; RUST_LOG still wins when set.
    let level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(level);
    }
    let _ = builder.try_init();

    let registry = sigmon::default::get_demods();

    if matches.is_present("list") {
        println!("available demodulators:");
        for info in registry.iter() {
            println!("  {:<12} {}", info.name, info.description);
        }
        return ExitCode::SUCCESS;
    }

    let mut opts = DemodOptions::default();
    opts.pocsag.mode = match matches.value_of("pocsag-mode").unwrap() {
        "standard" => PocsagMessageMode::Standard,
        "numeric" => PocsagMessageMode::Numeric,
        "alpha" => PocsagMessageMode::Alpha,
        "skyper" => PocsagMessageMode::Skyper,
        _ => PocsagMessageMode::Auto,
    };
    opts.pocsag.error_correction = ErrorCorrection::from_level(
        matches.value_of("error-correction").unwrap().parse().unwrap_or(2),
    );
    opts.pocsag.invert = matches.is_present("invert");
    opts.pocsag.show_partial = matches.is_present("show-partial");
    opts.pocsag.prune_empty = matches.is_present("prune-empty");
    opts.pocsag.heuristic_prune = matches.is_present("heuristic-prune");
    opts.pocsag.charset = match matches.value_of("charset").unwrap() {
        "DE" => PocsagCharset::De,
        "SE" => PocsagCharset::Se,
        "FR" => PocsagCharset::Fr,
        "SI" => PocsagCharset::Si,
        _ => PocsagCharset::Us,
    };
    opts.packet.aprs = matches.is_present("aprs");
    opts.morse.dit_ms = matches.value_of("morse-dit").unwrap().parse().unwrap_or(50);
    opts.morse.gap_ms = matches.value_of("morse-gap").unwrap().parse().unwrap_or(50);
    opts.morse.threshold = matches.value_of("morse-threshold").unwrap().parse().unwrap_or(500);
    opts.morse.auto_threshold = !matches.is_present("morse-manual-threshold");
    opts.morse.auto_timing = !matches.is_present("morse-manual-timing");

    // Instantiate the selected demodulators, in the order given.
    let names: Vec<&str> = match matches.values_of("demod") {
        Some(values) => values.collect(),
        None => {
            error!("no demodulators selected; use -a NAME (see --list)");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let mut demods: Vec<Box<dyn Demodulator>> = Vec::new();
    for name in &names {
        match registry.make(name, &opts) {
            Ok(demod) => demods.push(demod),
            Err(err) => {
                error!("demodulator {}: {}", name, err);
                return ExitCode::from(EXIT_USAGE);
            }
        }
    }

    let mut pipeline = match Pipeline::new(demods) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("{}", err);
            return ExitCode::from(EXIT_RATE_MISMATCH);
        }
    };
    info!(
        "monitoring {} demodulators at {} Hz (overlap {})",
        names.len(),
        pipeline.sample_rate(),
        pipeline.overlap()
    );

    let flush = !matches.is_present("no-flush");
    let mut sink: Box<dyn RecordSink> = if matches.is_present("json") {
        Box::new(JsonSink::new(flush))
    } else {
        Box::new(ConsoleSink::new(flush))
    };

    let input = matches.value_of("INPUT").unwrap();
    let mut source: Box<dyn Read> = if input == "-" {
        Box::new(std::io::stdin())
    } else {
        match File::open(input) {
            Ok(file) => Box::new(file),
            Err(err) => {
                error!("cannot open {}: {}", input, err);
                return ExitCode::from(EXIT_OPEN_ERROR);
            }
        }
    };

    match pump(source.as_mut(), &mut pipeline, sink.as_mut()) {
        Ok(()) => {
            pipeline.finalize(sink.as_mut());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("read error: {}", err);
            pipeline.finalize(sink.as_mut());
            ExitCode::from(EXIT_READ_ERROR)
        }
    }
}

/// Read the raw stream and feed it through the pipeline in blocks.
fn pump(
    source: &mut dyn Read,
    pipeline: &mut Pipeline,
    sink: &mut dyn RecordSink,
) -> std::io::Result<()> {
    let mut bytes = [0u8; 16384];
    let mut samples: Vec<i16> = Vec::with_capacity(bytes.len() / 2);
    // A sample may straddle a read boundary.
    let mut carry: Option<u8> = None;

    loop {
        let got = match source.read(&mut bytes) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        samples.clear();
        let mut chunk = &bytes[..got];
        if let Some(low) = carry.take() {
            samples.push(i16::from_le_bytes([low, chunk[0]]));
            chunk = &chunk[1..];
        }
        let mut pairs = chunk.chunks_exact(2);
        for pair in &mut pairs {
            samples.push(i16::from_le_bytes([pair[0], pair[1]]));
        }
        carry = pairs.remainder().first().copied();

        pipeline.process(&samples, sink);
    }
}
