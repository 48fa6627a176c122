//! Integration tests for the stutter engine
//!
//! These drive the processor the way a host does, block after block, and
//! check where the looping output is read from.

use chopshop_core::domain::chain::reverse_in_place;
use chopshop_core::domain::engine::StutterEngine;
use chopshop_core::{
    AudioBlock, BlockContext, ChainConfiguration, ChopShopProcessor, EffectParameters, ProcessSpec,
    ProcessorState, StutterRate, TriggerMode,
};
use chopshop_tests::{generate_ramp, generate_sine_wave, join_channel, multichannel, split_blocks};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const SR: u32 = 48000;

fn processor_with(params: EffectParameters, block_size: usize, channels: usize) -> ChopShopProcessor {
    let mut processor = ChopShopProcessor::new();
    processor.set_state(&ProcessorState {
        parameters: params,
        chain_order: "0,1,2,3".to_string(),
    });
    processor
        .prepare(ProcessSpec::new(SR, block_size, channels))
        .unwrap();
    processor
}

fn run(processor: &mut ChopShopProcessor, blocks: &mut [AudioBlock], context: impl Fn(usize) -> BlockContext) {
    for (index, block) in blocks.iter_mut().enumerate() {
        processor.process(block, context(index));
    }
}

// ============================================================================
// END-TO-END SCENARIO
// ============================================================================

#[test]
fn test_threshold_trigger_at_5000_loops_to_17000() {
    let params = EffectParameters {
        stutter_rate: StutterRate::Eighth,
        trigger_mode: TriggerMode::Threshold,
        threshold_db: 0.0,
        ..Default::default()
    };
    let order = ChainConfiguration::default();
    let context = BlockContext::new(Some(120.0), false);

    let mut engine = StutterEngine::new(ProcessSpec::new(SR, 1000, 1)).unwrap();
    // 0.9 hit at 5000..5200, silence elsewhere
    let input: Vec<f32> = (0..30000)
        .map(|i| if (5000..5200).contains(&i) { 0.9 } else { 0.0 })
        .collect();
    let mut blocks = split_blocks(&[input], 1000);

    for block in blocks.iter_mut().take(5) {
        engine.process_block(block, context, &params, &order);
    }
    assert_eq!(engine.player().cursor().segment_length(), 12000);
    let anchor_before = engine.player().cursor().anchor();

    engine.process_block(&mut blocks[5], context, &params, &order);
    let anchor = engine.player().cursor().anchor();
    assert_ne!(anchor, anchor_before);
    // Loop starts on the trigger sample
    assert_eq!(anchor, 5000);
    assert_eq!(engine.player().cursor().position(), 1000);

    for block in blocks.iter_mut().take(16).skip(6) {
        engine.process_block(block, context, &params, &order);
    }
    // The decaying tail never retriggers
    assert_eq!(engine.player().cursor().anchor(), anchor);
    assert_eq!(engine.player().cursor().position(), 11000);

    engine.process_block(&mut blocks[16], context, &params, &order);
    assert_eq!(engine.player().cursor().position(), 0);

    for block in blocks.iter_mut().skip(17) {
        engine.process_block(block, context, &params, &order);
    }
    assert_eq!(engine.player().cursor().anchor(), anchor);

    let output = join_channel(&blocks, 0);
    // The hit opens every pass at full level: readPos 0 at 5000, 17000, 29000
    for start in [5000, 17000, 29000] {
        assert!(output[start..start + 200].iter().all(|&s| s == 0.9));
    }
    assert!(output[..5000].iter().all(|&s| s == 0.0));
    assert!(output[5200..16760].iter().all(|&s| s == 0.0));
    // Seam at 16760..17000 fades silence into the loop start
    assert_eq!(output[16760], 0.0);
    assert!((output[16900] - 0.9 * 140.0 / 240.0).abs() < 1e-5);
}

#[test]
fn test_free_running_loop_repeats_first_segment() {
    // 1/64 at 120 BPM = 1500 samples
    let params = EffectParameters {
        stutter_rate: StutterRate::SixtyFourth,
        ..Default::default()
    };
    let mut processor = processor_with(params, 512, 1);
    let input = generate_ramp(6000);
    let mut blocks = split_blocks(&[input.clone()], 512);

    run(&mut processor, &mut blocks, |_| BlockContext::new(Some(120.0), false));
    let output = join_channel(&blocks, 0);

    assert_eq!(&output[..1260], &input[..1260]);
    for k in 0..1500 {
        assert_eq!(output[1500 + k], output[k]);
        assert_eq!(output[3000 + k], output[k]);
    }
}

#[test]
fn test_note_on_starts_loop_at_note_on() {
    let params = EffectParameters {
        stutter_rate: StutterRate::SixtyFourth,
        trigger_mode: TriggerMode::Midi,
        ..Default::default()
    };
    let mut processor = processor_with(params, 500, 2);
    let input = generate_ramp(6000);
    let mut blocks = split_blocks(&multichannel(&input, 2), 500);

    run(&mut processor, &mut blocks, |index| BlockContext::new(Some(120.0), index == 6));

    for ch in 0..2 {
        let output = join_channel(&blocks, ch);
        // Note-on at 3000: the loop starts there and repeats 1500 samples later
        for k in 0..1000 {
            assert_eq!(output[3000 + k], input[3000 + k]);
            assert_eq!(output[4500 + k], input[3000 + k]);
        }
    }
}

#[test]
fn test_pitch_up_octave_on_first_block() {
    let params = EffectParameters {
        pitch_semitones: 12.0,
        ..Default::default()
    };
    let mut processor = processor_with(params, 64, 1);
    let input = generate_ramp(64);
    let mut block = AudioBlock::from_channels(vec![input.clone()]);

    processor.process(&mut block, BlockContext::new(Some(120.0), false));

    for i in 0..32 {
        assert_eq!(block.channel(0)[i], input[2 * i]);
    }
}

#[test]
fn test_missing_tempo_matches_120_bpm() {
    let params = EffectParameters {
        stutter_rate: StutterRate::ThirtySecond,
        ..Default::default()
    };
    let signal = generate_sine_wave(220.0, SR, 8192, 0.8);

    let mut with_tempo = processor_with(params, 256, 1);
    let mut a = split_blocks(&[signal.clone()], 256);
    run(&mut with_tempo, &mut a, |_| BlockContext::new(Some(120.0), false));

    let mut without_tempo = processor_with(params, 256, 1);
    let mut b = split_blocks(&[signal], 256);
    run(&mut without_tempo, &mut b, |_| BlockContext::new(None, false));

    assert_eq!(join_channel(&a, 0), join_channel(&b, 0));
}

#[test]
fn test_zero_mix_is_transparent_over_many_blocks() {
    let params = EffectParameters {
        stutter_rate: StutterRate::Sixteenth,
        pitch_semitones: 5.0,
        reverse: true,
        mix: 0.0,
        ..Default::default()
    };
    let mut processor = processor_with(params, 128, 2);
    let signal = generate_sine_wave(440.0, SR, 4096, 0.5);
    let mut blocks = split_blocks(&multichannel(&signal, 2), 128);

    run(&mut processor, &mut blocks, |_| BlockContext::default());
    assert_eq!(join_channel(&blocks, 0), signal);
    assert_eq!(join_channel(&blocks, 1), signal);
}

#[test]
fn test_parameter_changes_from_control_thread() {
    let mut processor = processor_with(EffectParameters::default(), 256, 2);
    let store = processor.parameters();
    let done = Arc::new(AtomicBool::new(false));

    let control = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut i = 0u32;
            while !done.load(Ordering::Relaxed) {
                store.set_pitch_semitones((i % 49) as f32 - 24.0);
                store.set_speed_percent(50.0 + (i % 151) as f32);
                store.set_link(i % 2 == 0);
                store.set_reverse(i % 3 == 0);
                store.set_stutter_rate_index((i % 7) as i64);
                store.set_mix((i % 11) as f32 / 10.0);
                i = i.wrapping_add(1);
            }
        })
    };

    let signal = generate_sine_wave(330.0, SR, 256 * 200, 0.7);
    let mut blocks = split_blocks(&multichannel(&signal, 2), 256);
    run(&mut processor, &mut blocks, |i| BlockContext::new(Some(90.0 + i as f64), i % 10 == 0));

    done.store(true, Ordering::Relaxed);
    control.join().unwrap();

    for block in &blocks {
        for ch in 0..2 {
            assert!(block.channel(ch).iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
    }
}

#[test]
fn test_reprepare_at_new_rate_starts_silent() {
    let mut processor = processor_with(EffectParameters::default(), 256, 1);
    let mut block = AudioBlock::from_channels(vec![vec![0.9; 256]]);
    processor.process(&mut block, BlockContext::default());

    processor.prepare(ProcessSpec::new(44100, 256, 1)).unwrap();
    assert_eq!(processor.spec().map(|s| s.sample_rate.hz()), Some(44100));

    // Captured audio from before the re-prepare is gone
    let mut block = AudioBlock::from_channels(vec![vec![0.0; 256]]);
    processor.process(&mut block, BlockContext::default());
    assert!(block.channel(0).iter().all(|&s| s == 0.0));
}

proptest! {
    #[test]
    fn prop_reverse_twice_restores_segment(
        samples in proptest::collection::vec(-1.0f32..1.0, 1..512),
    ) {
        let mut block = AudioBlock::from_channels(vec![samples.clone(), samples.iter().map(|s| -s).collect()]);
        let original = block.clone();
        let len = block.num_samples();

        reverse_in_place(&mut block, len);
        reverse_in_place(&mut block, len);
        prop_assert_eq!(block, original);
    }
}
