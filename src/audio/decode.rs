//! WAV loading via hound.

use super::PcmAudio;
use crate::error::KaraError;
use hound::{SampleFormat, WavReader};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Decode a WAV file to mono `f32` PCM.
///
/// Integer samples of any bit depth are scaled into `[-1, 1]`; multichannel
/// audio is averaged down to one channel.
pub fn decode_wav(path: &Path) -> Result<PcmAudio, KaraError> {
    let source_id = path.display().to_string();
    let reader = WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(source) => KaraError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => KaraError::audio(&source_id, other),
    })?;
    let pcm = read_samples(reader, &source_id)?;
    debug!(
        source = %source_id,
        sample_rate = pcm.sample_rate,
        seconds = pcm.duration(),
        "decoded wav"
    );
    Ok(pcm)
}

fn read_samples<R: Read>(reader: WavReader<R>, source_id: &str) -> Result<PcmAudio, KaraError> {
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(KaraError::audio(
                    source_id,
                    format!("unsupported bit depth {}", spec.bits_per_sample),
                ));
            }
            let scale = 2f32.powi(spec.bits_per_sample as i32 - 1);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| KaraError::audio(source_id, e))?
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| KaraError::audio(source_id, e))?,
    };

    Ok(PcmAudio {
        samples: downmix(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Average interleaved frames of `channels` samples into one channel.
///
/// A trailing partial frame is dropped.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => interleaved
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}
