// Realtime sound-source collaborator.
//
// CPAL's `Stream` is not `Send`, so — exactly like the teacher's
// `CpalBackend` — a dedicated thread owns it and runs until a shutdown
// flag is observed. Non-f32 formats are converted to f32 and
// multi-channel input is downmixed to mono before the callback runs,
// matching the teacher's `push_samples_to_queue` call sites.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

use crate::error::CaptureError;

/// The realtime callback shape the core supplies to a sound source:
/// a block of mono f32 samples and the absolute frame index of its
/// first sample.
pub type OnBlock = Box<dyn FnMut(&[f32], u64) + Send>;

/// Delivers blocks of audio from a realtime-priority source.
pub trait SoundSource {
    /// Start delivering blocks to `on_block` on a dedicated thread.
    /// Returns the sample rate the source settled on.
    fn start(&mut self, on_block: OnBlock) -> Result<u32, CaptureError>;

    /// Stop delivery and join the capture thread. Idempotent.
    fn stop(&mut self);
}

/// Captures from the host's default input device via `cpal`.
pub struct CpalSoundSource {
    shutdown_flag: Arc<AtomicBool>,
    sample_rate: Arc<AtomicU32>,
    absolute_frame: Arc<AtomicU64>,
    stream_thread: Option<JoinHandle<()>>,
}

impl Default for CpalSoundSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalSoundSource {
    pub fn new() -> Self {
        CpalSoundSource {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            sample_rate: Arc::new(AtomicU32::new(0)),
            absolute_frame: Arc::new(AtomicU64::new(0)),
            stream_thread: None,
        }
    }

    fn downmix_f32(data: &[f32], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            data.to_vec()
        } else {
            data.chunks(channels)
                .map(|c| c.iter().sum::<f32>() / channels as f32)
                .collect()
        }
    }

    fn downmix_i16(data: &[i16], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            data.iter().map(|&s| s as f32 / 32768.0).collect()
        } else {
            data.chunks(channels)
                .map(|c| c.iter().map(|&s| s as f32 / 32768.0).sum::<f32>() / channels as f32)
                .collect()
        }
    }

    fn downmix_u16(data: &[u16], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).collect()
        } else {
            data.chunks(channels)
                .map(|c| {
                    c.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).sum::<f32>() / channels as f32
                })
                .collect()
        }
    }
}

impl SoundSource for CpalSoundSource {
    fn start(&mut self, mut on_block: OnBlock) -> Result<u32, CaptureError> {
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        shutdown_flag.store(false, Ordering::SeqCst);
        let sample_rate_store = Arc::clone(&self.sample_rate);
        let absolute_frame = Arc::clone(&self.absolute_frame);

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<u32, CaptureError>>();

        let handle = thread::spawn(move || {
            let host = cpal::default_host();
            let device = match host.default_input_device() {
                Some(d) => d,
                None => {
                    let _ = ready_tx.send(Err(CaptureError::OpenFailed {
                        reason: "no input device available".to_string(),
                    }));
                    return;
                }
            };
            let supported = match device.default_input_config() {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaptureError::OpenFailed {
                        reason: format!("failed to get input config: {e}"),
                    }));
                    return;
                }
            };

            let sample_rate = supported.sample_rate().0;
            let channels = supported.channels() as usize;
            sample_rate_store.store(sample_rate, Ordering::SeqCst);

            let config = cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| log::error!("sound source stream error: {err}");
            let shutdown_cb = Arc::clone(&shutdown_flag);
            let frame_cb = Arc::clone(&absolute_frame);

            macro_rules! build_stream {
                ($ty:ty, $downmix:expr) => {
                    device.build_input_stream(
                        &config,
                        move |data: &[$ty], _: &cpal::InputCallbackInfo| {
                            if shutdown_cb.load(Ordering::Relaxed) {
                                return;
                            }
                            let mono = $downmix(data, channels);
                            let start = frame_cb.fetch_add(mono.len() as u64, Ordering::Relaxed);
                            on_block(&mono, start);
                        },
                        err_fn,
                        None,
                    )
                };
            }

            let stream = match supported.sample_format() {
                SampleFormat::F32 => build_stream!(f32, Self::downmix_f32),
                SampleFormat::I16 => build_stream!(i16, Self::downmix_i16),
                SampleFormat::U16 => build_stream!(u16, Self::downmix_u16),
                other => {
                    let _ = ready_tx.send(Err(CaptureError::OpenFailed {
                        reason: format!("unsupported sample format: {other:?}"),
                    }));
                    return;
                }
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaptureError::OpenFailed {
                        reason: format!("failed to build input stream: {e}"),
                    }));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::OpenFailed {
                    reason: format!("failed to start stream: {e}"),
                }));
                return;
            }

            let _ = ready_tx.send(Ok(sample_rate));

            while !shutdown_flag.load(Ordering::Relaxed) {
                thread::sleep(std::time::Duration::from_millis(50));
            }
        });

        self.stream_thread = Some(handle);
        ready_rx
            .recv()
            .map_err(|_| CaptureError::OpenFailed {
                reason: "sound source thread exited before starting".to_string(),
            })?
    }

    fn stop(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.stream_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalSoundSource {
    fn drop(&mut self) {
        self.stop();
    }
}
