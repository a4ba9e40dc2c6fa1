/// Per-leg flight playback: progress, position, heading and simulated time
use crate::domain::{AnimationPhase, AnimationSample, CameraTarget, Leg, SolarSample};
use crate::geo::{great_circle_interpolate, initial_bearing};
use crate::services::solar::subsolar_point;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Progress look-ahead used to derive the local heading along the arc
const HEADING_LOOKAHEAD: f64 = 0.01;
/// Share of the run spent in the take-off camera stage
const DEPARTING_UNTIL: f64 = 0.2;
const DEPARTURE_ALTITUDE: f64 = 2.2;
const CRUISE_ALTITUDE: f64 = 1.1;

/// Monotonic time source driving playback
pub trait Clock: Send + Sync {
    /// Time elapsed since a fixed, clock-specific origin
    fn now(&self) -> Duration;
}

/// Clock backed by tokio's timer, so paused test runtimes control it
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        tokio::time::Instant::now().saturating_duration_since(self.origin)
    }
}

/// Hand-cranked clock for deterministic stepping
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnimatorSettings {
    /// Wall-clock length of one leg at 1x speed
    pub nominal_duration: Duration,
    /// In-flight time assumed for the simulated clock
    pub simulated_flight: chrono::Duration,
    pub frame_interval: Duration,
}

impl Default for AnimatorSettings {
    fn default() -> Self {
        Self {
            nominal_duration: Duration::from_millis(5000),
            simulated_flight: chrono::Duration::hours(4),
            frame_interval: Duration::from_millis(16),
        }
    }
}

fn is_running_speed(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

fn phase_for(t: f64) -> AnimationPhase {
    if t >= 1.0 {
        AnimationPhase::Arrived
    } else if t < DEPARTING_UNTIL {
        AnimationPhase::Departing
    } else {
        AnimationPhase::Cruising
    }
}

/// State of one leg animation.
///
/// Progress is linear in clock time since the last anchor, so changing the
/// speed re-anchors instead of jumping. A non-positive or non-finite speed
/// freezes progress.
pub struct FlightRun {
    leg: Leg,
    token: u64,
    settings: AnimatorSettings,
    speed: f64,
    anchor: Duration,
    anchor_progress: f64,
    heading: f64,
    phase: AnimationPhase,
}

impl FlightRun {
    pub fn new(leg: Leg, token: u64, settings: AnimatorSettings, speed: f64, now: Duration) -> Self {
        let heading = initial_bearing(leg.origin(), leg.destination(), 0.0);
        Self {
            leg,
            token,
            settings,
            speed,
            anchor: now,
            anchor_progress: 0.0,
            heading,
            phase: AnimationPhase::Idle,
        }
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        !is_running_speed(self.speed)
    }

    pub fn progress_at(&self, now: Duration) -> f64 {
        if self.is_paused() {
            return self.anchor_progress;
        }
        let duration = self.settings.nominal_duration.as_secs_f64() / self.speed;
        if duration <= 0.0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.anchor).as_secs_f64();
        (self.anchor_progress + elapsed / duration).clamp(0.0, 1.0)
    }

    pub fn set_speed(&mut self, speed: f64, now: Duration) {
        self.anchor_progress = self.progress_at(now);
        self.anchor = now;
        self.speed = speed;
    }

    /// Frame at progress `t`, remembering the heading for degenerate spots
    pub fn sample(&mut self, t: f64) -> (AnimationSample, SolarSample) {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let (from, to) = (self.leg.origin(), self.leg.destination());
        let position = great_circle_interpolate(from, to, t);
        let ahead = great_circle_interpolate(from, to, (t + HEADING_LOOKAHEAD).min(1.0));
        self.heading = initial_bearing(position, ahead, self.heading);

        let phase = phase_for(t);
        let camera = match phase {
            AnimationPhase::Idle | AnimationPhase::Departing => CameraTarget {
                lat: from.lat,
                lng: from.lng,
                altitude: DEPARTURE_ALTITUDE,
            },
            AnimationPhase::Cruising | AnimationPhase::Arrived => CameraTarget {
                lat: to.lat,
                lng: to.lng,
                altitude: CRUISE_ALTITUDE,
            },
        };

        let flight_ms = self.settings.simulated_flight.num_milliseconds() as f64;
        let simulated_at =
            self.leg.start_timestamp + chrono::Duration::milliseconds((t * flight_ms) as i64);

        let sample = AnimationSample {
            lat: position.lat,
            lng: position.lng,
            heading_degrees: self.heading,
            progress: t,
            phase,
            camera,
            simulated_at,
        };
        (sample, subsolar_point(simulated_at))
    }

    /// Move to the progress implied by `now`; `None` once the leg has arrived
    pub fn advance(&mut self, now: Duration) -> Option<(AnimationSample, SolarSample)> {
        if self.phase == AnimationPhase::Arrived {
            return None;
        }
        let t = self.progress_at(now);
        let frame = self.sample(t);
        self.phase = frame.0.phase;
        Some(frame)
    }
}

/// Outcome of a single animation step
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    Frame(AnimationSample, SolarSample),
    /// A newer run (or a cancel) superseded this one
    Stale,
    Finished,
}

/// Cancellation handle for a started run.
///
/// Dropping the handle cancels the run and stops its frame task.
pub struct AnimationHandle {
    token: u64,
    current: Arc<AtomicU64>,
    speed: Option<watch::Sender<f64>>,
    task: Option<JoinHandle<()>>,
}

impl AnimationHandle {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.token
    }

    /// Invalidate the run; a no-op if something newer already took over
    pub fn cancel(&self) {
        let _ = self.current.compare_exchange(
            self.token,
            self.token + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Change playback speed of a driven run
    #[allow(dead_code)]
    pub fn set_speed(&self, speed: f64) {
        if let Some(tx) = &self.speed {
            let _ = tx.send(speed);
        }
    }

    /// Wait for the frame task to stop
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if self.is_active() {
            self.cancel();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Owner of the "current run" token. Only one leg animates at a time.
#[derive(Clone)]
pub struct FlightAnimator {
    current: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
    settings: AnimatorSettings,
}

impl FlightAnimator {
    pub fn new(clock: Arc<dyn Clock>, settings: AnimatorSettings) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(0)),
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> AnimatorSettings {
        self.settings
    }

    /// Begin a run for `leg`, invalidating whatever ran before
    pub fn start(&self, leg: Leg, speed: f64) -> (FlightRun, AnimationHandle) {
        let token = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Starting flight animation {} for leg {} ({} -> {}) at {}x",
            token, leg.id, leg.from_name, leg.to_name, speed
        );
        let run = FlightRun::new(leg, token, self.settings, speed, self.clock.now());
        let handle = AnimationHandle {
            token,
            current: self.current.clone(),
            speed: None,
            task: None,
        };
        (run, handle)
    }

    /// Invalidate every run, e.g. when playback is switched off
    pub fn stop(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current.load(Ordering::SeqCst) == token
    }

    /// Advance `run` to the clock's present, checking its token first
    pub fn tick(&self, run: &mut FlightRun) -> Tick {
        if !self.is_current(run.token()) {
            trace!("Dropping frame from stale animation {}", run.token());
            return Tick::Stale;
        }
        match run.advance(self.clock.now()) {
            Some((sample, solar)) => Tick::Frame(sample, solar),
            None => Tick::Finished,
        }
    }

    /// Drive a leg on a tokio interval until it arrives or is superseded.
    ///
    /// `on_complete` fires only when the leg reaches its destination, never
    /// after a cancel. Must be called from within a tokio runtime.
    pub fn start_flight_animation<S, C>(
        &self,
        leg: Leg,
        speed: f64,
        mut on_sample: S,
        on_complete: C,
    ) -> AnimationHandle
    where
        S: FnMut(AnimationSample, SolarSample) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let (mut run, mut handle) = self.start(leg, speed);
        let (speed_tx, mut speed_rx) = watch::channel(speed);
        let animator = self.clone();
        let frame_interval = self.settings.frame_interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if speed_rx.has_changed().unwrap_or(false) {
                    let speed = *speed_rx.borrow_and_update();
                    run.set_speed(speed, animator.clock.now());
                }
                match animator.tick(&mut run) {
                    Tick::Frame(sample, solar) => {
                        on_sample(sample, solar);
                        if run.phase() == AnimationPhase::Arrived {
                            debug!("Flight animation {} arrived", run.token());
                            on_complete();
                            break;
                        }
                    }
                    Tick::Stale => {
                        debug!("Flight animation {} superseded", run.token());
                        break;
                    }
                    Tick::Finished => break,
                }
            }
        });

        handle.speed = Some(speed_tx);
        handle.task = Some(task);
        handle
    }
}

/// Evenly spaced frames along a leg, independent of any clock
pub fn sample_path(leg: &Leg, steps: usize, settings: AnimatorSettings) -> Vec<AnimationSample> {
    let steps = steps.max(1);
    let mut run = FlightRun::new(leg.clone(), 0, settings, 1.0, Duration::ZERO);
    (0..=steps)
        .map(|i| run.sample(i as f64 / steps as f64).0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Transport;
    use crate::geo::{haversine_distance_km, GeoPoint};
    use std::sync::Mutex;

    fn leg(id: i64, from: (f64, f64), to: (f64, f64)) -> Leg {
        Leg {
            id,
            from_name: format!("from-{}", id),
            from_lat: from.0,
            from_lng: from.1,
            to_name: format!("to-{}", id),
            to_lat: to.0,
            to_lng: to.1,
            start_timestamp: "2024-06-01T10:00:00Z".parse().unwrap(),
            media: vec![],
            title: None,
            transport: Transport::Plane,
            note: None,
        }
    }

    fn seoul_tokyo() -> Leg {
        leg(1, (37.5665, 126.978), (35.6762, 139.6503))
    }

    fn london_seoul() -> Leg {
        leg(2, (51.5074, -0.1278), (37.5665, 126.978))
    }

    fn manual() -> (ManualClock, FlightAnimator) {
        let clock = ManualClock::default();
        let animator = FlightAnimator::new(Arc::new(clock.clone()), AnimatorSettings::default());
        (clock, animator)
    }

    fn frame(tick: Tick) -> (AnimationSample, SolarSample) {
        match tick {
            Tick::Frame(s, solar) => (s, solar),
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn test_phases_follow_progress() {
        let (clock, animator) = manual();
        let (mut run, _handle) = animator.start(seoul_tokyo(), 1.0);
        assert_eq!(run.phase(), AnimationPhase::Idle);

        let (first, _) = frame(animator.tick(&mut run));
        assert_eq!(first.progress, 0.0);
        assert_eq!(first.phase, AnimationPhase::Departing);
        assert_eq!((first.lat, first.lng), (37.5665, 126.978));
        assert_eq!(first.camera.altitude, DEPARTURE_ALTITUDE);

        clock.advance(Duration::from_millis(2500));
        let (mid, _) = frame(animator.tick(&mut run));
        assert!((mid.progress - 0.5).abs() < 1e-9);
        assert_eq!(mid.phase, AnimationPhase::Cruising);
        assert_eq!(mid.camera.lat, 35.6762);

        clock.advance(Duration::from_secs(10));
        let (last, _) = frame(animator.tick(&mut run));
        assert_eq!(last.progress, 1.0);
        assert_eq!(last.phase, AnimationPhase::Arrived);
        assert_eq!((last.lat, last.lng), (35.6762, 139.6503));

        assert_eq!(animator.tick(&mut run), Tick::Finished);
    }

    #[test]
    fn test_speed_divides_duration() {
        let (clock, animator) = manual();
        let (mut run, _handle) = animator.start(seoul_tokyo(), 4.0);
        clock.advance(Duration::from_millis(625));
        let (s, _) = frame(animator.tick(&mut run));
        assert!((s.progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_speed_pauses_instead_of_dividing() {
        let (clock, animator) = manual();
        let (mut run, _handle) = animator.start(seoul_tokyo(), 0.0);
        assert!(run.is_paused());
        clock.advance(Duration::from_secs(60));
        let (s, _) = frame(animator.tick(&mut run));
        assert_eq!(s.progress, 0.0);

        let nan_run = FlightRun::new(seoul_tokyo(), 9, AnimatorSettings::default(), f64::NAN, Duration::ZERO);
        assert_eq!(nan_run.progress_at(Duration::from_secs(100)), 0.0);
    }

    #[test]
    fn test_speed_change_keeps_progress_continuous() {
        let (clock, animator) = manual();
        let (mut run, _handle) = animator.start(seoul_tokyo(), 1.0);
        clock.advance(Duration::from_millis(1000));
        run.set_speed(0.0, clock.now());
        clock.advance(Duration::from_secs(30));
        assert!((run.progress_at(clock.now()) - 0.2).abs() < 1e-9);
        run.set_speed(2.0, clock.now());
        clock.advance(Duration::from_millis(1000));
        assert!((run.progress_at(clock.now()) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_new_run_invalidates_old_one() {
        let (clock, animator) = manual();
        let (mut old, old_handle) = animator.start(seoul_tokyo(), 1.0);
        frame(animator.tick(&mut old));
        let (mut new, new_handle) = animator.start(london_seoul(), 1.0);
        clock.advance(Duration::from_millis(100));
        assert_eq!(animator.tick(&mut old), Tick::Stale);
        assert!(!old_handle.is_active());
        assert!(new_handle.is_active());
        frame(animator.tick(&mut new));
    }

    #[test]
    fn test_cancel_and_stop_invalidate() {
        let (_clock, animator) = manual();
        let (mut run, handle) = animator.start(seoul_tokyo(), 1.0);
        handle.cancel();
        assert_eq!(animator.tick(&mut run), Tick::Stale);

        let (mut run, handle) = animator.start(seoul_tokyo(), 1.0);
        animator.stop();
        assert!(!handle.is_active());
        assert_eq!(animator.tick(&mut run), Tick::Stale);
    }

    #[test]
    fn test_cancel_of_superseded_handle_leaves_current_run() {
        let (_clock, animator) = manual();
        let (_old, old_handle) = animator.start(seoul_tokyo(), 1.0);
        let (mut new, new_handle) = animator.start(london_seoul(), 1.0);
        old_handle.cancel();
        assert!(new_handle.is_active());
        frame(animator.tick(&mut new));
    }

    #[test]
    fn test_heading_follows_curving_arc() {
        // A great circle from London to Seoul starts north-east and ends south-east
        let path = sample_path(&london_seoul(), 20, AnimatorSettings::default());
        let first = path.first().unwrap().heading_degrees;
        let late = path[18].heading_degrees;
        assert!(first < 90.0, "initial heading {}", first);
        assert!(late > 90.0, "late heading {}", late);
        for s in &path {
            assert!((0.0..360.0).contains(&s.heading_degrees));
        }
    }

    #[test]
    fn test_final_heading_reuses_previous() {
        let path = sample_path(&seoul_tokyo(), 10, AnimatorSettings::default());
        let n = path.len();
        assert!((path[n - 1].heading_degrees - path[n - 2].heading_degrees).abs() < 1.0);
    }

    #[test]
    fn test_zero_length_leg_keeps_heading() {
        let path = sample_path(&leg(5, (10.0, 10.0), (10.0, 10.0)), 4, AnimatorSettings::default());
        assert!(path.iter().all(|s| s.heading_degrees == 0.0));
        assert!(path.iter().all(|s| s.lat == 10.0 && s.lng == 10.0));
    }

    #[test]
    fn test_path_points_lie_on_great_circle() {
        let l = london_seoul();
        let total = haversine_distance_km(l.origin(), l.destination());
        for s in sample_path(&l, 8, AnimatorSettings::default()) {
            let covered = haversine_distance_km(l.origin(), GeoPoint::new(s.lat, s.lng));
            assert!((covered - total * s.progress).abs() < 1e-3);
        }
    }

    #[test]
    fn test_simulated_clock_spans_flight_duration() {
        let l = seoul_tokyo();
        let path = sample_path(&l, 4, AnimatorSettings::default());
        assert_eq!(path[0].simulated_at, l.start_timestamp);
        assert_eq!(path[2].simulated_at, l.start_timestamp + chrono::Duration::hours(2));
        assert_eq!(path[4].simulated_at, l.start_timestamp + chrono::Duration::hours(4));
    }

    #[test]
    fn test_solar_sample_tracks_simulated_clock() {
        let (clock, animator) = manual();
        let (mut run, _handle) = animator.start(seoul_tokyo(), 1.0);
        let (_, solar_start) = frame(animator.tick(&mut run));
        clock.advance(Duration::from_secs(5));
        let (_, solar_end) = frame(animator.tick(&mut run));
        // 10:00 UTC -> 14:00 UTC moves the sun 60 degrees west
        assert!((solar_start.lng - 30.0).abs() < 1e-9);
        assert!((solar_end.lng - (-30.0)).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driven_animation_completes() {
        let animator = FlightAnimator::new(Arc::new(TokioClock::new()), AnimatorSettings::default());
        let samples = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let sink = samples.clone();
        let mut handle = animator.start_flight_animation(
            seoul_tokyo(),
            1.0,
            move |s, _| sink.lock().unwrap().push(s),
            move || {
                let _ = done_tx.send(());
            },
        );
        done_rx.await.unwrap();
        handle.finished().await;

        let samples = samples.lock().unwrap();
        assert!(samples.len() > 100);
        assert_eq!(samples.last().unwrap().phase, AnimationPhase::Arrived);
        for pair in samples.windows(2) {
            assert!(pair[0].progress <= pair[1].progress);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_legs_stops_old_samples() {
        let animator = FlightAnimator::new(Arc::new(TokioClock::new()), AnimatorSettings::default());
        let log = Arc::new(Mutex::new(Vec::<(i64, f64)>::new()));
        let old_completed = Arc::new(Mutex::new(false));

        let sink = log.clone();
        let flag = old_completed.clone();
        let mut old = animator.start_flight_animation(
            seoul_tokyo(),
            1.0,
            move |s, _| sink.lock().unwrap().push((1, s.progress)),
            move || *flag.lock().unwrap() = true,
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        let sink = log.clone();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let mut new = animator.start_flight_animation(
            london_seoul(),
            2.0,
            move |s, _| sink.lock().unwrap().push((2, s.progress)),
            move || {
                let _ = done_tx.send(());
            },
        );
        old.finished().await;
        done_rx.await.unwrap();
        new.finished().await;

        let log = log.lock().unwrap();
        let first_new = log.iter().position(|(id, _)| *id == 2).unwrap();
        assert!(first_new > 0);
        assert!(log[first_new..].iter().all(|(id, _)| *id == 2));
        assert!(log[..first_new].iter().all(|(_, p)| *p < 1.0));
        assert!(!*old_completed.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_handle_stops_driver() {
        let animator = FlightAnimator::new(Arc::new(TokioClock::new()), AnimatorSettings::default());
        let completed = Arc::new(Mutex::new(false));
        let flag = completed.clone();
        let mut handle =
            animator.start_flight_animation(seoul_tokyo(), 1.0, |_, _| {}, move || *flag.lock().unwrap() = true);
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.cancel();
        handle.finished().await;
        assert!(!*completed.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_speed_change() {
        let animator = FlightAnimator::new(Arc::new(TokioClock::new()), AnimatorSettings::default());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let mut handle = animator.start_flight_animation(seoul_tokyo(), 0.0, |_, _| {}, move || {
            let _ = done_tx.send(());
        });
        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.set_speed(10.0);
        let started = tokio::time::Instant::now();
        done_rx.await.unwrap();
        handle.finished().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_driver() {
        let animator = FlightAnimator::new(Arc::new(TokioClock::new()), AnimatorSettings::default());
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        let handle = animator.start_flight_animation(
            seoul_tokyo(),
            1e-6,
            move |_, _| *sink.lock().unwrap() += 1,
            || {},
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        let token = handle.token();
        drop(handle);
        assert!(!animator.is_current(token));

        let before = *count.lock().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(*count.lock().unwrap(), before);
    }
}
