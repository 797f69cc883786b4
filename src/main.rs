use anyhow::{Context, Result};
use clap::Parser;
use glowcam::capture::{FrameSource, WebcamSource};
use glowcam::output::{FrameSink, LoopbackSink};
use glowcam::segmentation;
use glowcam::{BackgroundMode, EffectPipeline, PresetStore, Settings, SettingsTransition};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    /// If not provided, background modes degrade to pass-through
    #[arg(long)]
    model: Option<String>,

    /// Preset catalog file (JSON)
    #[arg(long)]
    presets: Option<PathBuf>,

    /// Name of the preset to activate from the catalog
    #[arg(long)]
    preset: Option<String>,

    /// Background mode: none, light-blur, strong-blur, custom, included-{1,2,3}
    #[arg(long, default_value = "none")]
    background: String,

    /// Replacement image for image-backed background modes
    #[arg(long)]
    background_image: Option<PathBuf>,

    /// Skin smoothing amount, 0.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    smoothing: f32,

    /// Brightness, -1.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    brightness: f32,

    /// Contrast, 0.0 to 2.0
    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    /// Saturation, 0.0 to 2.0
    #[arg(long, default_value_t = 1.0)]
    saturation: f32,

    /// Warmth, -1.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    warmth: f32,

    /// Sharpness, 0.0 to 1.0
    #[arg(long, default_value_t = 0.0)]
    sharpness: f32,

    /// Mirror the video horizontally
    #[arg(long)]
    mirror: bool,
}

impl Args {
    fn settings_from_flags(&self) -> Result<Settings> {
        let background_mode = self
            .background
            .parse::<BackgroundMode>()
            .map_err(anyhow::Error::msg)?;
        Ok(Settings {
            skin_smoothing_amount: self.smoothing,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            warmth: self.warmth,
            sharpness: self.sharpness,
            background_mode,
            mirror_video: self.mirror,
        }
        .clamped())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Glowcam starting");
    tracing::info!("Output: {}x{} @ {} fps", args.width, args.height, args.fps);

    // Resolve the target settings: a named preset wins over the flags.
    let (target_settings, preset_image_path) = if let Some(name) = &args.preset {
        let path = args
            .presets
            .clone()
            .context("--preset requires --presets pointing at a catalog file")?;
        let store = PresetStore::load(&path)?;
        let preset = store
            .get(name)
            .with_context(|| format!("No preset named '{}' in {}", name, path.display()))?;
        tracing::info!("Activating preset '{}' ({})", preset.name, preset.mode);
        (
            preset.settings.clone().clamped(),
            preset.image_path.clone().map(PathBuf::from),
        )
    } else {
        (args.settings_from_flags()?, None)
    };

    let mut capture = WebcamSource::new(args.input_device, args.width, args.height, args.fps)
        .context("Failed to initialize webcam capture")?;

    let mut sink = LoopbackSink::new(&args.output_device, args.width, args.height)
        .context("Failed to initialize v4l2loopback output")?;

    let mut pipeline = match &args.model {
        Some(model_path) => {
            tracing::info!("Loading segmentation model from {}", model_path);
            let provider = segmentation::create_default_provider(model_path)
                .context("Failed to load segmentation model")?;
            EffectPipeline::with_segmentation(provider)
        }
        None => {
            tracing::info!("No segmentation model; masked effects pass through");
            EffectPipeline::new()
        }
    };

    // Replacement image: CLI flag wins, then the preset's path.
    let image_path = args.background_image.clone().or(preset_image_path);
    if let Some(path) = image_path {
        if target_settings.background_mode.needs_image() {
            let image = image::open(&path)
                .with_context(|| format!("Failed to load background image {}", path.display()))?
                .to_rgb8();
            pipeline.set_background_image(target_settings.background_mode, image);
        } else {
            tracing::warn!(
                "Background image given but mode {} does not use one",
                target_settings.background_mode
            );
        }
    }

    run_loop(&mut capture, &mut sink, &mut pipeline, target_settings, args.fps)
}

fn run_loop<C, O>(
    capture: &mut C,
    sink: &mut O,
    pipeline: &mut EffectPipeline,
    target: Settings,
    target_fps: u32,
) -> Result<()>
where
    C: FrameSource,
    O: FrameSink,
{
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps as f32);

    // Fade the effect in from neutral so the virtual camera does not pop.
    let mut transition = SettingsTransition::new(Settings::default(), target);
    transition.start();

    let mut frame_count = 0u64;
    let mut total_capture = Duration::ZERO;
    let mut total_process = Duration::ZERO;
    let mut total_output = Duration::ZERO;

    tracing::info!("Entering frame loop, press Ctrl+C to stop");

    loop {
        let loop_start = Instant::now();

        let capture_start = Instant::now();
        let frame = capture.next_frame().context("Failed to capture frame")?;
        total_capture += capture_start.elapsed();

        let settings = transition.settings_at(Instant::now());

        let process_start = Instant::now();
        let processed = pipeline.process(&frame, &settings);
        total_process += process_start.elapsed();

        let output_start = Instant::now();
        sink.write_frame(&processed)
            .context("Failed to write frame")?;
        total_output += output_start.elapsed();

        frame_count += 1;
        if frame_count % 30 == 0 {
            let avg_capture_ms = total_capture.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_process_ms = total_process.as_secs_f64() * 1000.0 / frame_count as f64;
            let avg_output_ms = total_output.as_secs_f64() * 1000.0 / frame_count as f64;
            let total_ms = avg_capture_ms + avg_process_ms + avg_output_ms;
            tracing::info!(
                "Frame {}: capture={:.1}ms, process={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
                frame_count,
                avg_capture_ms,
                avg_process_ms,
                avg_output_ms,
                total_ms,
                1000.0 / total_ms
            );
        }

        let elapsed = loop_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }
}
