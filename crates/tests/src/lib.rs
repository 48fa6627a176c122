//! Shared signal generators and block helpers for the integration tests

use chopshop_core::AudioBlock;

pub fn generate_sine_wave(frequency: f32, sample_rate: u32, num_samples: usize, amplitude: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| 2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32)
        .map(|phase| phase.sin() * amplitude)
        .collect()
}

pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Silence up to `onset`, then a constant `level`
pub fn generate_step(num_samples: usize, onset: usize, level: f32) -> Vec<f32> {
    (0..num_samples)
        .map(|i| if i >= onset { level } else { 0.0 })
        .collect()
}

/// Distinct value per sample, handy for checking where reads come from
pub fn generate_ramp(num_samples: usize) -> Vec<f32> {
    (0..num_samples).map(|i| i as f32 / num_samples as f32).collect()
}

/// Same signal on every channel
pub fn multichannel(signal: &[f32], num_channels: usize) -> Vec<Vec<f32>> {
    vec![signal.to_vec(); num_channels]
}

/// Cut planar channels into consecutive blocks of `block_size` frames
pub fn split_blocks(channels: &[Vec<f32>], block_size: usize) -> Vec<AudioBlock> {
    let frames = channels.first().map(Vec::len).unwrap_or(0);
    (0..frames)
        .step_by(block_size.max(1))
        .map(|start| {
            let end = (start + block_size).min(frames);
            AudioBlock::from_channels(channels.iter().map(|c| c[start..end].to_vec()).collect())
        })
        .collect()
}

/// Concatenate one channel of a run of blocks
pub fn join_channel(blocks: &[AudioBlock], channel: usize) -> Vec<f32> {
    blocks
        .iter()
        .flat_map(|b| b.channel(channel).iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join() {
        let signal = generate_ramp(10);
        let blocks = split_blocks(&multichannel(&signal, 2), 4);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].num_samples(), 2);
        assert_eq!(join_channel(&blocks, 1), signal);
    }

    #[test]
    fn test_step() {
        assert_eq!(generate_step(4, 2, 0.5), vec![0.0, 0.0, 0.5, 0.5]);
    }
}
