use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Bands older than this are treated as "no audio playing".
pub const STALE_AFTER_MS: f32 = 500.0;

/// Per-frame frequency-band summary, every field in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioBands {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub overall: f32,
    pub beat_detected: bool,
    pub beat_intensity: f32,
}

impl AudioBands {
    /// Scales every level by `gain`, keeping the [0, 1] range.
    pub fn scaled(mut self, gain: f32) -> Self {
        let s = gain.clamp(0.0, 8.0);
        if (s - 1.0).abs() < 1e-3 {
            return self;
        }
        self.bass = (self.bass * s).clamp(0.0, 1.0);
        self.mid = (self.mid * s).clamp(0.0, 1.0);
        self.treble = (self.treble * s).clamp(0.0, 1.0);
        self.overall = (self.overall * s).clamp(0.0, 1.0);
        self.beat_intensity = (self.beat_intensity * s).clamp(0.0, 1.0);
        self
    }
}

/// Pull-based source of band levels. `None` means nothing is playing this frame, which engines
/// treat as neutral modulation.
pub trait AudioBandProvider {
    fn bands(&self) -> Option<AudioBands>;
}

/// Provider for runs without an audio device.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AudioBandProvider for Silence {
    fn bands(&self) -> Option<AudioBands> {
        None
    }
}

/// Seqlock-published bands shared between the analyzer thread and the frame loop.
pub struct AtomicAudioBands {
    seq: AtomicU64,
    bass: AtomicU32,
    mid: AtomicU32,
    treble: AtomicU32,
    overall: AtomicU32,
    beat: AtomicU32,
    beat_intensity: AtomicU32,
    updated_ms: AtomicU64,
}

impl AtomicAudioBands {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            bass: AtomicU32::new(0),
            mid: AtomicU32::new(0),
            treble: AtomicU32::new(0),
            overall: AtomicU32::new(0),
            beat: AtomicU32::new(0),
            beat_intensity: AtomicU32::new(0),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, b: AudioBands) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        self.bass.store(b.bass.to_bits(), Ordering::Relaxed);
        self.mid.store(b.mid.to_bits(), Ordering::Relaxed);
        self.treble.store(b.treble.to_bits(), Ordering::Relaxed);
        self.overall.store(b.overall.to_bits(), Ordering::Relaxed);
        self.beat
            .store(u32::from(b.beat_detected), Ordering::Relaxed);
        self.beat_intensity
            .store(b.beat_intensity.to_bits(), Ordering::Relaxed);
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release);
    }

    pub fn load(&self) -> AudioBands {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let bands = AudioBands {
                bass: f32::from_bits(self.bass.load(Ordering::Relaxed)),
                mid: f32::from_bits(self.mid.load(Ordering::Relaxed)),
                treble: f32::from_bits(self.treble.load(Ordering::Relaxed)),
                overall: f32::from_bits(self.overall.load(Ordering::Relaxed)),
                beat_detected: self.beat.load(Ordering::Relaxed) != 0,
                beat_intensity: f32::from_bits(self.beat_intensity.load(Ordering::Relaxed)),
            };

            if v1 == self.seq.load(Ordering::Acquire) {
                return bands;
            }
        }
    }

    /// Milliseconds since the last store; `None` before the first one.
    pub fn age_ms(&self) -> Option<f32> {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return None;
        }
        Some(now_ms().saturating_sub(t) as f32)
    }
}

impl Default for AtomicAudioBands {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBandProvider for AtomicAudioBands {
    fn bands(&self) -> Option<AudioBands> {
        match self.age_ms() {
            Some(age) if age <= STALE_AFTER_MS => Some(self.load()),
            _ => None,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {name}")?;
    }
    Ok(())
}

/// Live microphone capture plus a background analyzer publishing [`AudioBands`].
pub struct AudioSystem {
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    bands: Arc<AtomicAudioBands>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    pub fn new(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = (supported.channels() as usize).max(1);
        let config: cpal::StreamConfig = supported.clone().into();

        let rb = HeapRb::<f32>::new((sample_rate_hz as usize).saturating_mul(4));
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let bands = Arc::new(AtomicAudioBands::new());
        let bands_for_thread = Arc::clone(&bands);
        let stop_for_thread = Arc::clone(&stop);

        let err_fn = |err: cpal::StreamError| warn!(%err, "audio stream error");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_mono(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_mono(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_mono(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        stream.play().context("start input stream")?;
        info!(sample_rate_hz, channels, "audio capture started");

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(&mut cons, sample_rate_hz, &stop_for_thread, &bands_for_thread)
        });

        Ok(Self {
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            bands,
            sample_rate_hz,
        })
    }

    pub fn shared_bands(&self) -> Arc<AtomicAudioBands> {
        Arc::clone(&self.bands)
    }
}

impl AudioBandProvider for AudioSystem {
    fn bands(&self) -> Option<AudioBands> {
        self.bands.bands()
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

fn select_input_device(host: &cpal::Host, query: Option<&str>) -> anyhow::Result<cpal::Device> {
    if let Some(want) = query.map(str::to_lowercase) {
        let found = host
            .input_devices()
            .context("enumerate input devices")?
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&want))
                    .unwrap_or(false)
            });
        return found.ok_or_else(|| anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_mono<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().map(|s| (*s).to_float_sample()).sum();
        let _ = prod.try_push(sum / channels as f32);
    }
}

const WINDOW: usize = 1024;
const HOP: usize = 256;

/// Band edges in Hz: bass, mid, treble.
const BAND_EDGES_HZ: [f32; 4] = [20.0, 250.0, 2000.0, 12000.0];

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    stop: &AtomicBool,
    out: &AtomicAudioBands,
) {
    let mut ring = vec![0.0f32; WINDOW];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let mut analyzer = BandAnalyzer::new(sample_rate_hz);

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            ring[write_pos] = s;
            write_pos = (write_pos + 1) % WINDOW;
            filled = (filled + 1).min(WINDOW);
            since_last += 1;
            if filled == WINDOW && since_last >= HOP {
                since_last = 0;
                out.store(analyzer.process(&ring, write_pos));
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// FFT band splitter with spectral-flux beat detection and exponential smoothing.
pub struct BandAnalyzer {
    sample_rate_hz: u32,
    hann: Vec<f32>,
    fft: Arc<dyn rustfft::Fft<f32>>,
    buf: Vec<Complex<f32>>,
    mags: Vec<f32>,
    prev_mags: Vec<f32>,
    flux_avg: f32,
    flux_hist: [f32; 3],
    smoothed: AudioBands,
}

impl BandAnalyzer {
    pub fn new(sample_rate_hz: u32) -> Self {
        let hann = (0..WINDOW)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / WINDOW as f32).cos())
            .collect();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(WINDOW);
        Self {
            sample_rate_hz: sample_rate_hz.max(1),
            hann,
            fft,
            buf: vec![Complex { re: 0.0, im: 0.0 }; WINDOW],
            mags: vec![0.0; WINDOW / 2],
            prev_mags: vec![0.0; WINDOW / 2],
            flux_avg: 0.0,
            flux_hist: [0.0; 3],
            smoothed: AudioBands::default(),
        }
    }

    /// Analyzes the ring buffer `ring` whose oldest sample sits at `start`.
    pub fn process(&mut self, ring: &[f32], start: usize) -> AudioBands {
        let n = WINDOW.min(ring.len());
        let mut energy = 0.0f32;
        for i in 0..WINDOW {
            let s = if n == 0 { 0.0 } else { ring[(start + i) % n] };
            energy += s * s;
            self.buf[i] = Complex {
                re: s * self.hann[i],
                im: 0.0,
            };
        }
        let rms = (energy / WINDOW as f32).sqrt().clamp(0.0, 1.0);

        self.fft.process(&mut self.buf);
        let half = self.mags.len();
        let mut flux = 0.0f32;
        for i in 0..half {
            let c = self.buf[i];
            let m = (c.re * c.re + c.im * c.im).sqrt();
            let d = m - self.prev_mags[i];
            if d > 0.0 {
                flux += d;
            }
            self.prev_mags[i] = m;
            self.mags[i] = m;
        }
        let flux = (flux * 0.002).tanh();

        let mut sums = [0.0f32; 3];
        let mut counts = [0u32; 3];
        let bin_hz = self.sample_rate_hz as f32 / WINDOW as f32;
        for (i, m) in self.mags.iter().enumerate().skip(1) {
            let f = i as f32 * bin_hz;
            if f < BAND_EDGES_HZ[0] {
                continue;
            }
            if f >= BAND_EDGES_HZ[3] {
                break;
            }
            let band = BAND_EDGES_HZ[1..3].iter().filter(|&&e| f >= e).count();
            sums[band] += m;
            counts[band] += 1;
        }
        let mut levels = [0.0f32; 3];
        for i in 0..3 {
            levels[i] = (sums[i] / counts[i].max(1) as f32 * 0.01).tanh();
        }

        // Peak picking on the flux history, one hop of latency.
        self.flux_hist = [self.flux_hist[1], self.flux_hist[2], flux];
        self.flux_avg = self.flux_avg * 0.95 + flux * 0.05;
        let peak = self.flux_hist[1] > self.flux_hist[0] && self.flux_hist[1] > self.flux_hist[2];
        let thr = (self.flux_avg * 1.45).max(1e-6);
        let beat = peak && self.flux_hist[1] > thr;

        let s = &mut self.smoothed;
        s.bass = s.bass * 0.85 + levels[0] * 0.15;
        s.mid = s.mid * 0.85 + levels[1] * 0.15;
        s.treble = s.treble * 0.85 + levels[2] * 0.15;
        s.overall = s.overall * 0.85 + rms * 0.15;
        s.beat_detected = beat;
        s.beat_intensity = if beat {
            ((self.flux_hist[1] - thr) / (thr + 1e-6)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        *s
    }
}
