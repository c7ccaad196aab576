use futures_util::StreamExt;
use log::{info, warn};
use tempfile::TempPath;

use crate::audio;
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::transcribe::SegmentTranscriber;

/// Transcript of one segment. Empty text means that segment's
/// transcription call failed and was absorbed.
#[derive(Debug)]
pub struct SegmentResult {
    /// 1-based, in chronological order.
    pub segment_id: usize,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Terminal artifact of a pipeline run.
#[derive(Debug)]
pub struct TranscriptionResult {
    /// Segment texts joined with a single space, trimmed.
    pub text: String,
    pub segments: Vec<SegmentResult>,
    pub duration_secs: f64,
    pub chunk_count: usize,
    pub chunk_duration_secs: u32,
}

/// One end-to-end run: split → transcribe all segments → aggregate.
///
/// Takes ownership of the staged source so it is removed on every exit
/// path, along with all segment artifacts. Segments are transcribed with
/// a bounded in-flight window (`config.transcribe_concurrency`); results
/// are collected strictly in index order, and a single segment's failure
/// degrades that segment to empty text without aborting the run.
pub async fn run_pipeline<T: SegmentTranscriber + Sync>(
    source: TempPath,
    chunk_duration_secs: u32,
    config: &AppConfig,
    transcriber: &T,
) -> Result<TranscriptionResult> {
    if chunk_duration_secs == 0 || chunk_duration_secs > config.max_chunk_duration_secs {
        return Err(PipelineError::Validation(format!(
            "chunk_duration must be between 1 and {}",
            config.max_chunk_duration_secs
        )));
    }

    let split = audio::split(&source, chunk_duration_secs, &config.work_dir)?;
    let chunk_count = split.segments.len();

    let texts: Vec<String> = futures_util::stream::iter(split.segments.iter())
        .map(|segment| async move {
            info!("Transcribing segment {}/{}", segment.index + 1, chunk_count);
            transcriber.transcribe(segment.artifact_path()).await
        })
        .buffered(config.transcribe_concurrency.max(1))
        .collect()
        .await;

    let mut segments = Vec::with_capacity(chunk_count);
    for (segment, text) in split.segments.iter().zip(texts) {
        if text.is_empty() {
            warn!(
                "Segment {}/{} produced no text",
                segment.index + 1,
                chunk_count
            );
        }
        segments.push(SegmentResult {
            segment_id: segment.index + 1,
            text,
            start_time: segment.start_time,
            end_time: segment.end_time,
        });
    }

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    // Explicit cleanup on the happy path; TempPath drop covers every
    // early-return path above.
    for segment in split.segments {
        let path = segment.artifact_path().to_path_buf();
        if let Err(e) = segment.close() {
            warn!("Failed to delete segment artifact {}: {e}", path.display());
        }
    }
    if let Err(e) = source.close() {
        warn!("Failed to delete staged source: {e}");
    }

    info!(
        "Pipeline run complete: {} segments, {} characters",
        chunk_count,
        text.len()
    );
    Ok(TranscriptionResult {
        text,
        segments,
        duration_secs: split.duration_secs,
        chunk_count,
        chunk_duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    const TEST_RATE: u32 = 1000;

    /// Fake endpoint: reads a segment artifact and answers "segN" where N
    /// is the window index baked into the samples, so ordering can be
    /// checked independently of call order. Indices in `fail` degrade to
    /// empty text, later segments answer faster than earlier ones.
    struct FakeTranscriber {
        fail: Vec<i16>,
    }

    impl SegmentTranscriber for FakeTranscriber {
        async fn transcribe(&self, artifact: &Path) -> String {
            let mut reader = WavReader::open(artifact).unwrap();
            let index = reader.samples::<i16>().next().unwrap().unwrap();
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(index as u64 * 10)))
                .await;
            if self.fail.contains(&index) {
                String::new()
            } else {
                format!("seg{index}")
            }
        }
    }

    /// Mono WAV where every sample in window `i` holds the value `i`.
    fn stage_indexed_wav(dir: &Path, duration_secs: f64, chunk_secs: u32) -> TempPath {
        let path = dir.join("staged-source.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: TEST_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        let window = chunk_secs as usize * TEST_RATE as usize;
        let total = (duration_secs * TEST_RATE as f64).round() as usize;
        for i in 0..total {
            writer.write_sample((i / window) as i16).unwrap();
        }
        writer.finalize().unwrap();
        TempPath::from_path(path)
    }

    fn test_config(work_dir: &Path) -> AppConfig {
        AppConfig {
            work_dir: work_dir.to_path_buf(),
            transcribe_concurrency: 4,
            ..AppConfig::default()
        }
    }

    fn leftover_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn full_run_orders_segments_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let source = stage_indexed_wav(dir.path(), 95.0, 30);
        let config = test_config(dir.path());
        let transcriber = FakeTranscriber { fail: vec![] };

        let result = run_pipeline(source, 30, &config, &transcriber).await.unwrap();

        assert_eq!(result.chunk_count, 4);
        assert_eq!(result.chunk_duration_secs, 30);
        assert!((result.duration_secs - 95.0).abs() < 1e-9);
        assert_eq!(result.text, "seg0 seg1 seg2 seg3");

        let ids: Vec<usize> = result.segments.iter().map(|s| s.segment_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(result.segments[3].start_time, 90.0);
        assert_eq!(result.segments[3].end_time, 120.0);

        // Joined-in-order texts must reproduce the full text exactly.
        let joined = result
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined.trim(), result.text);

        assert!(leftover_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn failing_segment_is_absorbed_without_touching_others() {
        let dir = TempDir::new().unwrap();
        let source = stage_indexed_wav(dir.path(), 95.0, 30);
        let config = test_config(dir.path());
        let transcriber = FakeTranscriber { fail: vec![2] };

        let result = run_pipeline(source, 30, &config, &transcriber).await.unwrap();

        let texts: Vec<&str> = result.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["seg0", "seg1", "", "seg3"]);
        assert_eq!(result.text, "seg0 seg1  seg3");
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn all_segments_failing_still_completes() {
        let dir = TempDir::new().unwrap();
        let source = stage_indexed_wav(dir.path(), 65.0, 30);
        let config = test_config(dir.path());
        let transcriber = FakeTranscriber {
            fail: vec![0, 1, 2],
        };

        let result = run_pipeline(source, 30, &config, &transcriber).await.unwrap();

        assert_eq!(result.chunk_count, 3);
        assert_eq!(result.text, "");
        assert!(result.segments.iter().all(|s| s.text.is_empty()));
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn decode_failure_aborts_and_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("staged-source.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let source = TempPath::from_path(path);
        let config = test_config(dir.path());
        let transcriber = FakeTranscriber { fail: vec![] };

        let err = run_pipeline(source, 30, &config, &transcriber)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn out_of_range_chunk_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let transcriber = FakeTranscriber { fail: vec![] };

        for bad in [0, config.max_chunk_duration_secs + 1] {
            let source = stage_indexed_wav(dir.path(), 10.0, 30);
            let err = run_pipeline(source, bad, &config, &transcriber)
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)));
        }
        // The staged sources were dropped with the runs.
        assert!(leftover_files(dir.path()).is_empty());
    }
}
