//! Audio output using cpal
//!
//! The stream lives on its own thread: cpal streams are not `Send` on every
//! platform, and the player hands its context across tasks. The thread
//! builds the stream, reports readiness, then parks until shutdown.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Negotiated device format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Running output stream
pub struct AudioOutput {
    format: OutputFormat,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Find the requested device, falling back to the default device
    fn find_device(device_name: Option<&str>) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = device_name {
            let mut devices = host.output_devices().map_err(|e| {
                Error::DeviceUnavailable(format!("Failed to enumerate devices: {}", e))
            })?;

            if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                info!("Found requested audio device: {}", name);
                return Ok(device);
            }
            warn!(
                "Requested device '{}' not found, falling back to default device",
                name
            );
        }

        host.default_output_device()
            .ok_or_else(|| Error::DeviceUnavailable("No default output device found".to_string()))
    }

    /// Prefer the requested rate in any format we can write; otherwise take
    /// the device default
    fn best_config(device: &Device, preferred_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to get device configs: {}", e)))?
            .filter(|c| {
                matches!(
                    c.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
            })
            .filter(|c| {
                c.min_sample_rate().0 <= preferred_rate && c.max_sample_rate().0 >= preferred_rate
            })
            .min_by_key(|c| {
                // Stereo f32 first
                let channel_rank = if c.channels() == 2 { 0 } else { 1 };
                let format_rank = if c.sample_format() == SampleFormat::F32 { 0 } else { 1 };
                channel_rank * 2 + format_rank
            });

        if let Some(config) = supported {
            let sample_format = config.sample_format();
            return Ok((
                config.with_sample_rate(cpal::SampleRate(preferred_rate)).config(),
                sample_format,
            ));
        }

        let config = device
            .default_output_config()
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to get default config: {}", e)))?;
        Ok((config.config(), config.sample_format()))
    }

    /// Resolve the device and the format it will run at
    pub fn negotiate(device_name: Option<&str>, preferred_rate: u32) -> Result<OutputFormat> {
        let device = Self::find_device(device_name)?;
        let (config, sample_format) = Self::best_config(&device, preferred_rate)?;
        let format = OutputFormat {
            device_name: device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };
        debug!(
            "Audio config: device={}, sample_rate={}, channels={}, format={:?}",
            format.device_name, format.sample_rate, format.channels, sample_format
        );
        Ok(format)
    }

    /// Start streaming; `render` fills interleaved f32 blocks
    ///
    /// The callback runs on a real-time thread and must not block for long.
    pub fn start<F>(format: &OutputFormat, buffer_size: Option<u32>, render: F) -> Result<Self>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        info!("Starting audio stream on {}", format.device_name);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let error_flag = Arc::new(AtomicBool::new(false));

        let thread_format = format.clone();
        let thread_error_flag = Arc::clone(&error_flag);
        let thread = std::thread::Builder::new()
            .name("dreamcast-output".to_string())
            .spawn(move || {
                let stream = match Self::open_stream(
                    &thread_format,
                    buffer_size,
                    render,
                    thread_error_flag,
                ) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Park until asked to stop (or the handle is dropped)
                let _ = shutdown_rx.recv();
                if let Err(e) = stream.pause() {
                    warn!("Failed to pause stream: {}", e);
                }
                debug!("Audio stream thread exiting");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Audio stream started successfully");
                Ok(Self {
                    format: format.clone(),
                    shutdown: Some(shutdown_tx),
                    thread: Some(thread),
                    error_flag,
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::AudioOutput("Output thread exited during startup".to_string()))
            }
        }
    }

    fn open_stream<F>(
        format: &OutputFormat,
        buffer_size: Option<u32>,
        render: F,
        error_flag: Arc<AtomicBool>,
    ) -> Result<Stream>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let device = Self::find_device(Some(&format.device_name))?;
        let (mut config, sample_format) = Self::best_config(&device, format.sample_rate)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        } else {
            debug!("Using device default buffer size");
        }

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32, F>(&device, &config, render, error_flag)?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16, F>(&device, &config, render, error_flag)?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16, F>(&device, &config, render, error_flag)?
            }
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to start stream: {}", e)))?;
        Ok(stream)
    }

    /// Render in f32, then clamp and convert to the device sample type
    fn build_stream<T, F>(
        device: &Device,
        config: &StreamConfig,
        mut render: F,
        error_flag: Arc<AtomicBool>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let channels = config.channels as usize;
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if scratch.len() < data.len() {
                        scratch.resize(data.len(), 0.0);
                    }
                    let block = &mut scratch[..data.len()];
                    render(block, channels);

                    for (out, &sample) in data.iter_mut().zip(block.iter()) {
                        *out = T::from_sample(sample.clamp(-1.0, 1.0));
                    }
                },
                stream_error_handler(error_flag),
                None,
            )
            .map_err(|e| Error::DeviceUnavailable(format!("Failed to build stream: {}", e)))
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// Whether the stream error callback has fired
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Stop the stream and join its thread
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            info!("Stopping audio stream");
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

/// Stream error callback: log and raise the shared flag
fn stream_error_handler(
    error_flag: Arc<AtomicBool>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        error!("Audio stream error: {}", err);
        error_flag.store(true, Ordering::SeqCst);
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
