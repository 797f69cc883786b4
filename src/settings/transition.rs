use super::Settings;
use std::time::{Duration, Instant};

/// Default length of a preset change fade.
pub const DEFAULT_TRANSITION_DURATION: Duration = Duration::from_millis(300);

/// Timed interpolation between two settings snapshots.
///
/// Created once when a preset or settings change is requested, started when
/// the change takes effect, then queried every frame for the settings to
/// feed the pipeline. Both endpoints are fixed at construction; querying is
/// a pure function of the supplied instant, so repeated queries at the same
/// time return identical snapshots and values never overshoot.
///
/// Scalar fields interpolate linearly. The background mode and the mirror
/// flag have no meaningful intermediate value, so they switch atomically
/// from the start value to the end value at half progress. At full progress
/// the end snapshot is returned verbatim.
#[derive(Debug, Clone)]
pub struct SettingsTransition {
    start: Settings,
    end: Settings,
    duration: Duration,
    started_at: Option<Instant>,
}

impl SettingsTransition {
    pub fn new(start: Settings, end: Settings) -> Self {
        Self::with_duration(start, end, DEFAULT_TRANSITION_DURATION)
    }

    pub fn with_duration(start: Settings, end: Settings, duration: Duration) -> Self {
        Self {
            start,
            end,
            duration,
            started_at: None,
        }
    }

    /// Begin the transition now. Calling again after the clock has started
    /// is ignored; endpoints never change once set.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Begin the transition at an explicit instant.
    pub fn start_at(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Progress in [0, 1] at the given instant. Zero before `start()`.
    pub fn progress(&self, now: Instant) -> f32 {
        let Some(started) = self.started_at else {
            return 0.0;
        };
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    /// The effective settings at the given instant.
    pub fn settings_at(&self, now: Instant) -> Settings {
        let progress = self.progress(now);
        if progress >= 1.0 {
            // Terminal state is the end snapshot exactly, not a lerp that
            // happens to land close to it.
            return self.end.clone();
        }

        let lerp = |a: f32, b: f32| a + (b - a) * progress;
        let switched = progress >= 0.5;

        Settings {
            skin_smoothing_amount: lerp(
                self.start.skin_smoothing_amount,
                self.end.skin_smoothing_amount,
            ),
            brightness: lerp(self.start.brightness, self.end.brightness),
            contrast: lerp(self.start.contrast, self.end.contrast),
            saturation: lerp(self.start.saturation, self.end.saturation),
            warmth: lerp(self.start.warmth, self.end.warmth),
            sharpness: lerp(self.start.sharpness, self.end.sharpness),
            background_mode: if switched {
                self.end.background_mode
            } else {
                self.start.background_mode
            },
            mirror_video: if switched {
                self.end.mirror_video
            } else {
                self.start.mirror_video
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BackgroundMode;

    fn endpoints() -> (Settings, Settings) {
        let start = Settings::default();
        let end = Settings {
            skin_smoothing_amount: 0.8,
            brightness: 0.4,
            contrast: 1.6,
            saturation: 0.5,
            warmth: -0.6,
            sharpness: 0.9,
            background_mode: BackgroundMode::StrongBlur,
            mirror_video: true,
        };
        (start, end)
    }

    #[test]
    fn test_before_start_reports_start_snapshot() {
        let (start, end) = endpoints();
        let transition = SettingsTransition::new(start.clone(), end);
        assert_eq!(transition.settings_at(Instant::now()), start);
    }

    #[test]
    fn test_endpoints_are_exact() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start.clone(), end.clone(), Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);

        assert_eq!(transition.settings_at(t0), start);
        // At and beyond the duration the end snapshot comes back verbatim.
        assert_eq!(transition.settings_at(t0 + Duration::from_millis(300)), end);
        assert_eq!(transition.settings_at(t0 + Duration::from_millis(310)), end);
        assert!(transition.is_complete(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_scalars_interpolate_linearly() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start, end, Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);

        let at_third = transition.settings_at(t0 + Duration::from_millis(100));
        assert!((at_third.brightness - 0.4 / 3.0).abs() < 1e-3);
        assert!((at_third.contrast - (1.0 + 0.6 / 3.0)).abs() < 1e-3);
        assert!((at_third.warmth - (-0.2)).abs() < 1e-3);
    }

    #[test]
    fn test_scalars_are_monotonic() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start, end, Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);

        let mut previous = transition.settings_at(t0);
        for ms in (10..=300).step_by(10) {
            let current = transition.settings_at(t0 + Duration::from_millis(ms));
            assert!(current.brightness >= previous.brightness);
            assert!(current.saturation <= previous.saturation);
            assert!(current.warmth <= previous.warmth);
            assert!(current.brightness <= 0.4);
            previous = current;
        }
    }

    #[test]
    fn test_idempotent_queries() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start, end, Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);

        let sample = t0 + Duration::from_millis(142);
        assert_eq!(transition.settings_at(sample), transition.settings_at(sample));
    }

    #[test]
    fn test_mode_switches_at_half_progress() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start, end, Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);

        let early = transition.settings_at(t0 + Duration::from_millis(100));
        assert_eq!(early.background_mode, BackgroundMode::None);
        assert!(!early.mirror_video);
        // Scalars are already about a third of the way there.
        assert!((early.brightness - 0.4 / 3.0).abs() < 1e-3);

        let late = transition.settings_at(t0 + Duration::from_millis(200));
        assert_eq!(late.background_mode, BackgroundMode::StrongBlur);
        assert!(late.mirror_video);
    }

    #[test]
    fn test_start_is_recorded_once() {
        let (start, end) = endpoints();
        let mut transition =
            SettingsTransition::with_duration(start, end.clone(), Duration::from_millis(300));
        let t0 = Instant::now();
        transition.start_at(t0);
        // A later second call must not rewind the clock.
        transition.start_at(t0 + Duration::from_millis(200));
        assert_eq!(transition.settings_at(t0 + Duration::from_millis(300)), end);
    }

    #[test]
    fn test_zero_duration_is_immediately_terminal() {
        let (start, end) = endpoints();
        let mut transition = SettingsTransition::with_duration(start, end.clone(), Duration::ZERO);
        let t0 = Instant::now();
        transition.start_at(t0);
        assert_eq!(transition.settings_at(t0), end);
    }
}
