#[derive(serde::Serialize, serde::Deserialize)]
pub struct TranscriptionDto {
    pub success: bool,
    pub text: String,
    pub segments: Vec<SegmentDto>,
    pub duration: f64,
    pub chunk_count: usize,
    pub chunk_duration: u32,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct SegmentDto {
    pub segment_id: usize,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(serde::Deserialize)]
pub struct UrlRequest {
    pub audio_url: String,
    pub chunk_duration: Option<u32>,
}
