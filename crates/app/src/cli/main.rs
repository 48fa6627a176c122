//! ChopShop CLI Application

use anyhow::{bail, Context};
use chopshop_core::domain::capture::RingBufferStore;
use chopshop_core::domain::config::{factory_preset, factory_presets, ChopShopConfig, ConfigManager, PresetManager};
use chopshop_core::domain::stutter::crossfade_samples;
use chopshop_core::domain::tempo::segment_length;
use chopshop_core::{ChainConfiguration, ChopShopProcessor, StutterRate, TriggerMode};
use chopshop_infra::{read_wav, write_wav, OfflineRenderer, RenderOptions};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chopshop")]
#[command(about = "Tempo-synced stutter and glitch processing for audio files", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a WAV file through the stutter engine
    Render(RenderArgs),

    /// Print the segment length for a tempo and note division
    Segment {
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,

        #[arg(long, default_value = "1/8")]
        rate: StutterRate,

        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage saved presets
    Presets {
        /// Preset directory (defaults to the user config directory)
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List factory and saved presets
    List,
    /// Print a preset as TOML
    Show { name: String },
    /// Save the given parameters as a preset
    Save {
        name: String,

        /// Start from this preset instead of the defaults
        #[arg(long)]
        from: Option<String>,

        #[command(flatten)]
        params: ParamArgs,
    },
    /// Delete a saved preset
    Delete { name: String },
    /// Copy factory presets into the preset directory
    Install,
}

#[derive(Args)]
struct RenderArgs {
    input: PathBuf,
    output: PathBuf,

    /// Start from a factory or saved preset
    #[arg(long)]
    preset: Option<String>,

    /// Preset directory for --preset
    #[arg(long)]
    preset_dir: Option<PathBuf>,

    #[command(flatten)]
    params: ParamArgs,

    /// Host tempo in BPM
    #[arg(long)]
    bpm: Option<f64>,

    /// Frames per processing block
    #[arg(long)]
    block_size: Option<usize>,

    /// Note-on times in seconds, comma separated
    #[arg(long, value_delimiter = ',')]
    note_on: Vec<f64>,

    /// Print the render report as JSON
    #[arg(long)]
    json: bool,
}

/// Parameter overrides shared by `render` and `presets save`
#[derive(Args)]
struct ParamArgs {
    /// Note division, e.g. 1/16
    #[arg(long)]
    rate: Option<StutterRate>,

    /// Pitch shift in semitones (-24..24)
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f32>,

    /// Speed in percent (50..200)
    #[arg(long)]
    speed: Option<f32>,

    /// Let speed follow pitch (varispeed)
    #[arg(long)]
    link: bool,

    /// Play segments backwards
    #[arg(long)]
    reverse: bool,

    /// always, midi or threshold
    #[arg(long)]
    trigger: Option<TriggerMode>,

    /// Transient threshold in dB (-60..0)
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f32>,

    /// Wet amount in percent (0..100)
    #[arg(long)]
    mix: Option<f32>,

    /// Stage order, e.g. 0,3,1,2
    #[arg(long)]
    chain: Option<String>,
}

impl ParamArgs {
    fn apply(&self, config: &mut ChopShopConfig) {
        let params = &mut config.parameters;
        if let Some(rate) = self.rate {
            params.stutter_rate = rate;
        }
        if let Some(pitch) = self.pitch {
            params.pitch_semitones = pitch;
        }
        if let Some(speed) = self.speed {
            params.speed_percent = speed;
        }
        if self.link {
            params.link = true;
        }
        if self.reverse {
            params.reverse = true;
        }
        if let Some(mode) = self.trigger {
            params.trigger_mode = mode;
        }
        if let Some(threshold) = self.threshold {
            params.threshold_db = threshold;
        }
        if let Some(mix) = self.mix {
            params.mix = mix / 100.0;
        }
        if let Some(chain) = &self.chain {
            config.chain_order = ChainConfiguration::parse_lenient(chain);
        }
        *config = config.sanitized();
    }
}

#[derive(Serialize)]
struct SegmentInfo {
    bpm: f64,
    rate: String,
    sample_rate: u32,
    segment_samples: usize,
    segment_ms: f64,
    crossfade_samples: usize,
}

fn preset_manager(dir: Option<PathBuf>) -> anyhow::Result<PresetManager> {
    let dir = match dir {
        Some(dir) => dir,
        None => PresetManager::default_preset_dir()?,
    };
    Ok(PresetManager::new(dir))
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<ChopShopConfig> {
    match path {
        Some(path) => ChopShopConfig::load_from_file(&path)
            .await
            .with_context(|| format!("loading config {}", path.display())),
        None => match ConfigManager::default_config_dir() {
            Ok(dir) => Ok(ConfigManager::new(dir).load().await),
            Err(_) => Ok(ChopShopConfig::factory_default()),
        },
    }
}

/// Saved presets shadow factory ones of the same name
async fn resolve_preset(manager: &PresetManager, name: &str) -> anyhow::Result<ChopShopConfig> {
    if manager.preset_exists(name).await {
        return Ok(manager.load_preset(name).await?);
    }
    match factory_preset(name) {
        Some(config) => Ok(config),
        None => bail!("no preset named '{}'", name),
    }
}

async fn render(args: RenderArgs, base: ChopShopConfig) -> anyhow::Result<()> {
    let mut config = match &args.preset {
        Some(name) => {
            let manager = preset_manager(args.preset_dir.clone())?;
            let mut preset = resolve_preset(&manager, name).await?;
            preset.app = base.app.clone();
            preset
        }
        None => base,
    };
    args.params.apply(&mut config);

    let input = read_wav(&args.input).with_context(|| format!("reading {}", args.input.display()))?;

    let options = RenderOptions {
        block_size: args.block_size.unwrap_or(config.app.block_size),
        bpm: Some(args.bpm.unwrap_or_else(|| config.app.tempo())),
        note_on_times: args.note_on.clone(),
    };

    let mut processor = ChopShopProcessor::new();
    processor.set_state(&config.processor_state());
    let mut renderer = OfflineRenderer::new(processor, options);

    let (output, report) = renderer.render(&input)?;
    write_wav(&args.output, &output).with_context(|| format!("writing {}", args.output.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Rendered {} -> {}", args.input.display(), args.output.display());
        println!(
            "  {} frames, {} ch @ {} Hz in {} blocks ({:.1} ms)",
            report.frames, report.channels, report.sample_rate, report.blocks, report.elapsed_ms
        );
        println!(
            "  rate {}  pitch {:+.1} st  speed {:.0}%  trigger {}  mix {:.0}%  chain {}",
            config.parameters.stutter_rate,
            config.parameters.pitch_semitones,
            config.parameters.speed_percent,
            config.parameters.trigger_mode,
            config.parameters.mix * 100.0,
            config.chain_order
        );
        println!(
            "  peak in {:.1} dBFS, peak out {:.1} dBFS",
            report.peak_in_dbfs, report.peak_out_dbfs
        );
    }
    Ok(())
}

fn segment(bpm: f64, rate: StutterRate, sample_rate: u32, json: bool) -> anyhow::Result<()> {
    if sample_rate == 0 {
        bail!("sample rate must be non-zero");
    }
    let sr = sample_rate as f64;
    let samples = segment_length(sr, bpm, rate, RingBufferStore::capacity_for(sr));
    let info = SegmentInfo {
        bpm,
        rate: rate.to_string(),
        sample_rate,
        segment_samples: samples,
        segment_ms: samples as f64 * 1000.0 / sr,
        crossfade_samples: crossfade_samples(sr).min(samples / 2),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!(
            "{} at {} BPM, {} Hz: {} samples ({:.2} ms), crossfade {} samples",
            info.rate, info.bpm, info.sample_rate, info.segment_samples, info.segment_ms, info.crossfade_samples
        );
    }
    Ok(())
}

async fn presets(dir: Option<PathBuf>, action: PresetAction) -> anyhow::Result<()> {
    let manager = preset_manager(dir)?;

    match action {
        PresetAction::List => {
            let saved = manager.list_presets().await?;
            println!("Factory presets:");
            for (name, _) in factory_presets() {
                println!("  {}", name);
            }
            println!("Saved presets ({}):", manager.preset_dir().display());
            if saved.is_empty() {
                println!("  (none)");
            }
            for name in saved {
                println!("  {}", name);
            }
        }
        PresetAction::Show { name } => {
            let config = resolve_preset(&manager, &name).await?;
            print!("{}", config.to_toml()?);
        }
        PresetAction::Save { name, from, params } => {
            let mut config = match from {
                Some(base) => resolve_preset(&manager, &base).await?,
                None => ChopShopConfig::factory_default(),
            };
            params.apply(&mut config);
            manager.save_preset(&name, &config).await?;
            println!("Saved preset '{}'", name);
        }
        PresetAction::Delete { name } => {
            manager.delete_preset(&name).await?;
            println!("Deleted preset '{}'", name);
        }
        PresetAction::Install => {
            let installed = manager.install_factory_presets().await?;
            println!("Installed {} factory preset(s) into {}", installed, manager.preset_dir().display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("ChopShop starting");

    match cli.command {
        Command::Render(args) => {
            let config = load_config(cli.config).await?;
            render(args, config).await
        }
        Command::Segment {
            bpm,
            rate,
            sample_rate,
            json,
        } => segment(bpm, rate, sample_rate, json),
        Command::Presets { dir, action } => presets(dir, action).await,
    }
}
