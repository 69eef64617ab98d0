use crate::error::MediaAcquisitionError;
use crate::transport::LocalTrack;
use async_trait::async_trait;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::media_engine::{MIME_TYPE_VP8, MIME_TYPE_VP9};
use webrtc::media::Sample;
use webrtc::media::io::ivf_reader::{IVFFileHeader, IVFReader};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const SAMPLE_BUFFER: usize = 8;

/// The media the broadcaster shares. Acquisition is host specific.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Opens the source and returns the tracks every viewer gets.
    async fn acquire(&self) -> Result<Vec<LocalTrack>, MediaAcquisitionError>;

    /// Stops producing media. Safe to call when nothing was acquired.
    async fn release(&self);
}

/// Plays a VP8/VP9 IVF file into a single video track at the file's frame rate.
pub struct IvfCapture {
    path: PathBuf,
    looping: bool,
    feeder: Mutex<Option<JoinHandle<()>>>,
    finished_tx: watch::Sender<bool>,
}

impl IvfCapture {
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        let (finished_tx, _) = watch::channel(false);
        Self {
            path: path.into(),
            looping,
            feeder: Mutex::new(None),
            finished_tx,
        }
    }

    /// Flips to `true` once playback ends: a non-looping file played out, or a
    /// looping file with no frames.
    pub fn finished(&self) -> watch::Receiver<bool> {
        self.finished_tx.subscribe()
    }
}

#[async_trait]
impl CaptureSource for IvfCapture {
    async fn acquire(&self) -> Result<Vec<LocalTrack>, MediaAcquisitionError> {
        let (_, header) = open_ivf(&self.path)?;

        let mime_type = match &header.four_cc {
            b"VP80" => MIME_TYPE_VP8,
            b"VP90" => MIME_TYPE_VP9,
            other => {
                return Err(MediaAcquisitionError::Unavailable(format!(
                    "unsupported IVF codec {}",
                    String::from_utf8_lossy(other)
                )));
            }
        };

        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            "beacon".to_owned(),
        ));

        let frame_duration = frame_duration(&header);
        info!(
            "Capturing {} ({}, {:?} per frame)",
            self.path.display(),
            mime_type,
            frame_duration
        );

        let _ = self.finished_tx.send(false);
        let feeder = tokio::spawn(feed_track(
            self.path.clone(),
            track.clone(),
            frame_duration,
            self.looping,
            self.finished_tx.clone(),
        ));

        if let Some(previous) = self.feeder.lock().await.replace(feeder) {
            previous.abort();
        }

        Ok(vec![track as LocalTrack])
    }

    async fn release(&self) {
        if let Some(feeder) = self.feeder.lock().await.take() {
            feeder.abort();
            debug!("Stopped feeding {}", self.path.display());
        }
    }
}

fn open_ivf(path: &Path) -> Result<(IVFReader<BufReader<File>>, IVFFileHeader), MediaAcquisitionError> {
    let file = File::open(path)
        .map_err(|e| MediaAcquisitionError::Unavailable(format!("{}: {e}", path.display())))?;
    IVFReader::new(BufReader::new(file))
        .map_err(|e| MediaAcquisitionError::Unavailable(format!("{}: {e}", path.display())))
}

fn frame_duration(header: &IVFFileHeader) -> Duration {
    if header.timebase_denominator == 0 {
        return Duration::from_millis(33);
    }
    let millis = 1000 * u64::from(header.timebase_numerator) / u64::from(header.timebase_denominator);
    Duration::from_millis(millis.max(1))
}

/// Paces samples from the reader thread onto the track.
async fn feed_track(
    path: PathBuf,
    track: Arc<TrackLocalStaticSample>,
    frame_duration: Duration,
    looping: bool,
    finished_tx: watch::Sender<bool>,
) {
    let (sample_tx, mut sample_rx) = mpsc::channel(SAMPLE_BUFFER);
    let reader_path = path.clone();
    let reader = tokio::task::spawn_blocking(move || {
        read_samples(&reader_path, frame_duration, looping, sample_tx)
    });

    let mut ticker = tokio::time::interval(frame_duration);
    while let Some(sample) = sample_rx.recv().await {
        if let Err(e) = track.write_sample(&sample).await {
            warn!("Failed to write sample: {}", e);
        }
        ticker.tick().await;
    }

    if let Err(e) = reader.await {
        warn!("IVF reader for {} panicked: {}", path.display(), e);
    }

    info!("Finished playing {}", path.display());
    let _ = finished_tx.send(true);
}

/// Runs on a blocking thread. Returns once the file is played out, a pass
/// yields no frames, or the feeder hung up.
fn read_samples(
    path: &Path,
    frame_duration: Duration,
    looping: bool,
    sample_tx: mpsc::Sender<Sample>,
) {
    loop {
        let mut reader = match open_ivf(path) {
            Ok((reader, _)) => reader,
            Err(e) => {
                warn!("Capture source went away: {}", e);
                return;
            }
        };

        let mut frames = 0usize;
        while let Ok((frame, _)) = reader.parse_next_frame() {
            frames += 1;
            let sample = Sample {
                data: frame.freeze(),
                duration: frame_duration,
                ..Default::default()
            };
            if sample_tx.blocking_send(sample).is_err() {
                return;
            }
        }

        if !looping {
            return;
        }
        if frames == 0 {
            warn!("{} has no frames, not looping", path.display());
            return;
        }
    }
}
