use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};
use std::path::Path;
use tempfile::TempPath;

use crate::error::{PipelineError, Result};

/// One fixed-duration slice of the source audio, owning its temporary
/// encoded artifact. The artifact is removed when the segment is dropped
/// or explicitly closed, whichever comes first.
#[derive(Debug)]
pub struct Segment {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    artifact: TempPath,
}

impl Segment {
    pub fn artifact_path(&self) -> &Path {
        &self.artifact
    }

    /// Delete the temporary artifact now instead of at drop.
    pub fn close(self) -> std::io::Result<()> {
        self.artifact.close()
    }
}

#[derive(Debug)]
pub struct SplitAudio {
    pub segments: Vec<Segment>,
    /// Total source duration in seconds, measured from the decoded samples.
    pub duration_secs: f64,
}

/// Split a source audio file into fixed-duration segments, each re-encoded
/// as an independent 16-bit PCM WAV in `work_dir`. The final segment may be
/// shorter than the nominal window; it is never padded or dropped.
///
/// Segment `i` covers the nominal window `[i*d, (i+1)*d)` seconds. Artifact
/// names carry a random suffix so concurrent runs sharing `work_dir` cannot
/// collide.
pub fn split(
    source: &Path,
    chunk_duration_secs: u32,
    work_dir: &Path,
) -> Result<SplitAudio> {
    if chunk_duration_secs == 0 {
        return Err(PipelineError::Validation(
            "chunk_duration must be a positive integer".to_string(),
        ));
    }

    let reader = WavReader::open(source)
        .map_err(|e| PipelineError::Decode(format!("cannot parse source as WAV: {e}")))?;
    let spec = reader.spec();
    let samples = decode_samples(reader)?;

    let duration_secs =
        samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);
    info!(
        "Decoded source: {} samples, {}Hz, {} channels, {:.2}s",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        duration_secs
    );

    let out_spec = WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // Interleaved samples per window; always a whole number of frames.
    let window_len =
        chunk_duration_secs as usize * spec.sample_rate as usize * spec.channels as usize;

    let mut segments = Vec::new();
    for (index, window) in samples.chunks(window_len).enumerate() {
        let artifact = write_segment_artifact(window, out_spec, work_dir)?;
        debug!(
            "Created segment {} ({} samples): {}",
            index + 1,
            window.len(),
            artifact.display()
        );
        segments.push(Segment {
            index,
            start_time: (index as u64 * chunk_duration_secs as u64) as f64,
            end_time: ((index as u64 + 1) * chunk_duration_secs as u64) as f64,
            artifact,
        });
    }

    info!("Split source into {} segments", segments.len());
    Ok(SplitAudio {
        segments,
        duration_secs,
    })
}

/// Normalize decoded samples to interleaved i16, whatever the source
/// encoding. Anything hound cannot read is a decode failure.
fn decode_samples(reader: WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<i16>> {
    let spec = reader.spec();
    let decode_err =
        |e: hound::Error| PipelineError::Decode(format!("failed to read samples: {e}"));

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits) if bits <= 16 => reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (SampleFormat::Int, bits) if bits <= 32 => {
            let shift = bits - 16;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_err)
        }
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err),
        (format, bits) => Err(PipelineError::Decode(format!(
            "unsupported sample encoding: {format:?} {bits}-bit"
        ))),
    }
}

fn write_segment_artifact(
    window: &[i16],
    spec: WavSpec,
    work_dir: &Path,
) -> Result<TempPath> {
    let artifact = tempfile::Builder::new()
        .prefix("segment-")
        .suffix(".wav")
        .tempfile_in(work_dir)?
        .into_temp_path();

    let mut writer = WavWriter::create(&artifact, spec).map_err(wav_write_err)?;
    for &sample in window {
        writer.write_sample(sample).map_err(wav_write_err)?;
    }
    writer.finalize().map_err(wav_write_err)?;

    Ok(artifact)
}

fn wav_write_err(e: hound::Error) -> PipelineError {
    match e {
        hound::Error::IoError(io) => PipelineError::Io(io),
        other => PipelineError::Upstream(format!("failed to encode segment: {other}")),
    }
}
