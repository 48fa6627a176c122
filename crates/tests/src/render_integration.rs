//! Integration tests for file rendering with presets and configuration

use chopshop_core::domain::config::{factory_preset, factory_presets};
use chopshop_core::domain::{ChopShopConfig, ConfigManager, PresetManager};
use chopshop_core::{ChainConfiguration, ChopShopProcessor};
use chopshop_infra::{read_wav, write_wav, AudioClip, OfflineRenderer, RenderOptions};
use chopshop_tests::{generate_sine_wave, generate_step, multichannel};
use tempfile::tempdir;

fn processor_for(config: &ChopShopConfig) -> ChopShopProcessor {
    let mut processor = ChopShopProcessor::new();
    processor.set_state(&config.processor_state());
    processor
}

fn stereo_clip(signal: &[f32], sample_rate: u32) -> AudioClip {
    AudioClip::new(multichannel(signal, 2), sample_rate).unwrap()
}

#[tokio::test]
async fn test_wav_render_wav_with_factory_preset() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("input.wav");
    let output_path = dir.path().join("output.wav");

    let signal = generate_step(24000, 6000, 0.5);
    write_wav(&input_path, &stereo_clip(&signal, 48000)).unwrap();

    let config = factory_preset("glitch-32").unwrap();
    let mut renderer = OfflineRenderer::new(processor_for(&config), RenderOptions::default());

    let input = read_wav(&input_path).unwrap();
    let (output, report) = renderer.render(&input).unwrap();
    write_wav(&output_path, &output).unwrap();

    assert_eq!(report.frames, 24000);
    assert_eq!(report.channels, 2);
    assert_eq!(report.blocks, 47);

    let reloaded = read_wav(&output_path).unwrap();
    assert_eq!(reloaded, output);
    assert!(reloaded.peak() <= 0.5 + 1e-6);
    assert_eq!(reloaded.channel(0), reloaded.channel(1));
}

#[tokio::test]
async fn test_every_factory_preset_renders() {
    let signal = generate_sine_wave(110.0, 44100, 20000, 0.6);
    let input = stereo_clip(&signal, 44100);

    for (name, config) in factory_presets() {
        let mut renderer = OfflineRenderer::new(
            processor_for(&config),
            RenderOptions {
                block_size: 300,
                bpm: Some(128.0),
                note_on_times: vec![0.1, 0.3],
            },
        );
        let (output, report) = renderer.render(&input).unwrap();

        assert_eq!(output.num_frames(), input.num_frames(), "preset {}", name);
        assert!(output.peak() <= 0.6 + 1e-4, "preset {}", name);
        assert!(report.peak_out_dbfs.is_finite(), "preset {}", name);
    }
}

#[tokio::test]
async fn test_saved_preset_drives_render() {
    let dir = tempdir().unwrap();
    let presets = PresetManager::new(dir.path().join("presets"));

    let mut config = ChopShopConfig::factory_default();
    config.parameters.mix = 0.0;
    config.parameters.pitch_semitones = 7.0;
    config.chain_order = ChainConfiguration::parse_lenient("3,2,1,0");
    presets.save_preset("dry-check", &config).await.unwrap();

    let loaded = presets.load_preset("dry-check").await.unwrap();
    assert_eq!(loaded, config);

    let processor = processor_for(&loaded);
    assert_eq!(processor.state().chain_order, "3,2,1,0");

    let mut renderer = OfflineRenderer::new(processor, RenderOptions::default());
    let input = stereo_clip(&generate_sine_wave(440.0, 48000, 5000, 0.4), 48000);
    let (output, _) = renderer.render(&input).unwrap();

    // Fully dry regardless of the wet path
    assert_eq!(output, input);
}

#[tokio::test]
async fn test_installed_presets_match_factory() {
    let dir = tempdir().unwrap();
    let presets = PresetManager::new(dir.path().to_path_buf());

    let installed = presets.install_factory_presets().await.unwrap();
    assert_eq!(installed, factory_presets().len());

    for (name, config) in factory_presets() {
        assert_eq!(presets.load_preset(name).await.unwrap(), config);
    }
}

#[tokio::test]
async fn test_config_state_survives_restart() {
    let dir = tempdir().unwrap();
    let manager = ConfigManager::new(dir.path().to_path_buf());

    let first = manager.load().await;
    assert_eq!(first, ChopShopConfig::default());

    let processor = ChopShopProcessor::new();
    processor.parameters().set_reverse(true);
    processor.parameters().set_pitch_semitones(-5.0);
    processor
        .parameters()
        .set_chain_order(ChainConfiguration::parse_lenient("0,3,1,2"));

    let mut saved = first.clone();
    saved.set_processor_state(&processor.state());
    manager.save(&saved).await.unwrap();

    let restored = ConfigManager::new(dir.path().to_path_buf()).load().await;
    assert_eq!(restored, saved);
    assert!(restored.parameters.reverse);
    assert_eq!(restored.chain_order.to_string(), "0,3,1,2");
}

#[tokio::test]
async fn test_repeated_renders_are_identical() {
    let config = factory_preset("reverse-octave").unwrap();
    let mut renderer = OfflineRenderer::new(
        processor_for(&config),
        RenderOptions {
            block_size: 256,
            bpm: Some(140.0),
            note_on_times: vec![0.05, 0.2],
        },
    );
    let input = stereo_clip(&generate_sine_wave(300.0, 48000, 16000, 0.5), 48000);

    let (first, _) = renderer.render(&input).unwrap();
    let (second, _) = renderer.render(&input).unwrap();
    assert_eq!(first, second);
}
