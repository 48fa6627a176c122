//! Example walking through preset management
//!
//! Run with: cargo run --package chopshop-core --example preset_demo

use chopshop_core::domain::config::{factory_preset, ChopShopConfig, PresetManager};
use chopshop_core::{AudioBlock, BlockContext, ChopShopProcessor, ProcessSpec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("chopshop_core=debug,info")
        .init();

    println!("=== ChopShop Preset Demo ===\n");

    let preset_dir = std::env::temp_dir().join("chopshop-preset-demo");
    let manager = PresetManager::new(preset_dir.clone());

    println!("1. Installing factory presets into {}", preset_dir.display());
    let installed = manager.install_factory_presets().await?;
    println!("   installed {} preset(s)", installed);

    println!("\n2. Available presets:");
    for name in manager.list_presets().await? {
        let config = manager.load_preset(&name).await?;
        println!(
            "   {:<16} rate {} pitch {:+.1} st trigger {} chain {}",
            name,
            config.parameters.stutter_rate,
            config.parameters.pitch_semitones,
            config.parameters.trigger_mode,
            config.chain_order
        );
    }

    println!("\n3. Saving a custom preset...");
    let mut custom = factory_preset("glitch-32").unwrap_or_else(ChopShopConfig::factory_default);
    custom.parameters.reverse = true;
    manager.save_preset("my-glitch", &custom).await?;
    println!("   saved 'my-glitch'");

    println!("\n4. Running one block with it...");
    let mut processor = ChopShopProcessor::new();
    processor.prepare(ProcessSpec::new(48000, 256, 2))?;
    processor.set_state(&custom.processor_state());

    let mut block = AudioBlock::new(2, 256);
    processor.process(&mut block, BlockContext::new(Some(128.0), false));
    println!("   processed {} frames", block.num_samples());

    manager.delete_preset("my-glitch").await?;
    println!("\n=== Demo complete ===");
    Ok(())
}
