// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end pipeline tests: synthesized waveforms from `sigmon-gen` through the default
//! registry's demodulators.

use sigmon::core::demod::DemodOptions;
use sigmon::core::pipeline::Pipeline;
use sigmon::core::record::VecSink;
use sigmon_gen::{generate_flex, generate_pocsag, FlexParams, PocsagParams};

/// Build a pipeline from registry names and run samples through it in `chunk`-sized blocks.
fn run_pipeline(names: &[&str], opts: &DemodOptions, samples: &[i16], chunk: usize) -> VecSink {
    let registry = sigmon::default::get_demods();
    let demods =
        names.iter().map(|name| registry.make(name, opts).unwrap()).collect::<Vec<_>>();
    let mut pipeline = Pipeline::new(demods).unwrap();

    let mut sink = VecSink::new();
    for block in samples.chunks(chunk.max(1)) {
        pipeline.process(block, &mut sink);
    }
    pipeline.finalize(&mut sink);
    sink
}

#[test]
fn pocsag_numeric_end_to_end() {
    let params = PocsagParams {
        baud: 512,
        address: 1234567,
        function: 0,
        message: "12345".to_string(),
        ..Default::default()
    };
    let samples = generate_pocsag(&params);
    let sink = run_pipeline(&["POCSAG512"], &DemodOptions::default(), &samples, 4096);

    let texts = sink.texts();
    assert!(
        texts.contains(&"POCSAG512: Address: 1234567  Function: 0  Numeric: 12345"),
        "records: {:?}",
        texts
    );
}

#[test]
fn pocsag_alpha_end_to_end() {
    let params = PocsagParams {
        baud: 1200,
        address: 8,
        function: 3,
        message: "hello".to_string(),
        ..Default::default()
    };
    let samples = generate_pocsag(&params);
    let sink = run_pipeline(&["POCSAG1200"], &DemodOptions::default(), &samples, 4096);

    assert!(
        sink.texts().iter().any(|t| t.contains("Alpha:   hello")),
        "records: {:?}",
        sink.texts()
    );
}

#[test]
fn pocsag_two_bit_errors_corrected() {
    let params = PocsagParams {
        baud: 2400,
        address: 88,
        function: 0,
        message: "911".to_string(),
        errors: 2,
        ..Default::default()
    };
    let samples = generate_pocsag(&params);
    let sink = run_pipeline(&["POCSAG2400"], &DemodOptions::default(), &samples, 4096);

    assert!(
        sink.texts().iter().any(|t| t.contains("Numeric: 911")),
        "records: {:?}",
        sink.texts()
    );
}

#[test]
fn pocsag_inverted_polarity_detected() {
    // Law: feeding the stream inverted must produce the same decoded pages.
    let mut params = PocsagParams {
        baud: 512,
        address: 196610,
        function: 0,
        message: "555".to_string(),
        ..Default::default()
    };
    let normal = generate_pocsag(&params);
    params.invert = true;
    let inverted = generate_pocsag(&params);

    let texts_a = run_pipeline(&["POCSAG512"], &DemodOptions::default(), &normal, 4096)
        .texts()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    let texts_b = run_pipeline(&["POCSAG512"], &DemodOptions::default(), &inverted, 4096)
        .texts()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();

    assert!(!texts_a.is_empty());
    assert_eq!(texts_a, texts_b);
}

#[test]
fn flex_alphanumeric_end_to_end() {
    let params = FlexParams {
        cycle: 3,
        frame: 10,
        capcode: 1234567,
        message: "HELLO FLEX".to_string(),
        ..Default::default()
    };
    let samples = generate_flex(&params);
    let sink = run_pipeline(&["FLEX"], &DemodOptions::default(), &samples, 4096);

    let texts = sink.texts();
    let found = texts
        .iter()
        .find(|t| t.contains("|ALN|"))
        .unwrap_or_else(|| panic!("no ALN record in {:?}", texts));
    assert!(found.contains("|1600/2/A/K|"), "{}", found);
    assert!(found.contains("|03.010|"), "{}", found);
    assert!(found.contains("|0001234567|"), "{}", found);
    assert!(found.ends_with("|ALN|HELLO FLEX"), "{}", found);
}

#[test]
fn block_size_independence() {
    // Law: for any block size, the decoded records match the single-block run.
    let params = PocsagParams {
        baud: 512,
        address: 424242,
        function: 0,
        message: "31337".to_string(),
        ..Default::default()
    };
    let samples = generate_pocsag(&params);

    let whole = run_pipeline(&["POCSAG512", "FLEX"], &DemodOptions::default(), &samples, usize::MAX)
        .texts()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();

    for chunk in [22050, 4096, 1000, 129] {
        let split = run_pipeline(&["POCSAG512", "FLEX"], &DemodOptions::default(), &samples, chunk)
            .texts()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        assert_eq!(whole, split, "chunk {}", chunk);
    }
    assert!(!whole.is_empty());
}

#[test]
fn coexisting_demodulators_do_not_cross_talk() {
    // A POCSAG transmission through the full pager bank: only the matching baud decodes.
    let params = PocsagParams {
        baud: 1200,
        address: 100,
        function: 0,
        message: "42".to_string(),
        ..Default::default()
    };
    let samples = generate_pocsag(&params);
    let sink = run_pipeline(
        &["POCSAG512", "POCSAG1200", "POCSAG2400", "FLEX"],
        &DemodOptions::default(),
        &samples,
        4096,
    );

    let texts = sink.texts();
    assert!(texts.iter().any(|t| t.starts_with("POCSAG1200:")), "records: {:?}", texts);
    assert!(!texts.iter().any(|t| t.starts_with("FLEX|")), "records: {:?}", texts);
}
