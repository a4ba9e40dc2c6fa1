/// Trip-level playback sequencing on top of per-leg animation
use crate::domain::Leg;
use serde::Serialize;
use std::time::Duration;

/// What the globe should do once the current leg has arrived
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybackStep {
    NextLeg { index: usize },
    RevealPanorama { url: String },
    Finished,
}

/// Steps through a trip's legs in order.
pub struct PlaybackController {
    legs: Vec<Leg>,
    current: Option<usize>,
    playing: bool,
    speed: f64,
}

impl PlaybackController {
    pub fn new(legs: Vec<Leg>, speed: f64) -> Self {
        Self {
            legs,
            current: None,
            playing: false,
            speed,
        }
    }

    pub fn current(&self) -> Option<&Leg> {
        self.current.and_then(|i| self.legs.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start or resume; begins at the first leg if nothing is selected
    pub fn play(&mut self) -> Option<&Leg> {
        if self.legs.is_empty() {
            return None;
        }
        self.playing = true;
        let index = *self.current.get_or_insert(0);
        self.legs.get(index)
    }

    #[allow(dead_code)]
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Jump to a leg; out-of-range indexes are ignored
    pub fn select(&mut self, index: usize) -> Option<&Leg> {
        if index < self.legs.len() {
            self.current = Some(index);
        }
        self.current()
    }

    #[allow(dead_code)]
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// How long each leg stays on screen; `None` while paused or stalled
    pub fn hold_duration(&self, nominal: Duration) -> Option<Duration> {
        if !self.playing || !self.speed.is_finite() || self.speed <= 0.0 {
            return None;
        }
        Some(nominal.div_f64(self.speed))
    }

    /// Advance after the current leg's animation arrived.
    ///
    /// The last leg ends playback and, when it carries a panorama, asks for
    /// it to be revealed.
    pub fn on_leg_arrived(&mut self) -> PlaybackStep {
        let Some(index) = self.current else {
            return PlaybackStep::Finished;
        };
        if index + 1 < self.legs.len() {
            self.current = Some(index + 1);
            return PlaybackStep::NextLeg { index: index + 1 };
        }
        self.playing = false;
        match self.legs.get(index).and_then(|l| l.panorama()) {
            Some(pano) => PlaybackStep::RevealPanorama {
                url: pano.url.clone(),
            },
            None => PlaybackStep::Finished,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedLeg {
    pub index: usize,
    pub leg_id: i64,
    pub from_name: String,
    pub to_name: String,
    pub hold_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackPlan {
    pub legs: Vec<PlannedLeg>,
    pub ending: PlaybackStep,
    pub total_ms: u128,
}

/// Run the controller over a trip from leg `from_index` on, without
/// rendering anything. An out-of-range start falls back to the first leg.
pub fn plan_playback(legs: Vec<Leg>, from_index: usize, speed: f64, nominal: Duration) -> PlaybackPlan {
    let mut controller = PlaybackController::new(legs, speed);
    let mut planned = Vec::new();
    let mut ending = PlaybackStep::Finished;

    controller.select(from_index);
    controller.play();
    while controller.is_playing() {
        let hold_ms = controller
            .hold_duration(nominal)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        if let (Some(index), Some(leg)) = (controller.current_index(), controller.current()) {
            planned.push(PlannedLeg {
                index,
                leg_id: leg.id,
                from_name: leg.from_name.clone(),
                to_name: leg.to_name.clone(),
                hold_ms,
            });
        }
        match controller.on_leg_arrived() {
            PlaybackStep::NextLeg { .. } => {}
            step => ending = step,
        }
    }

    let total_ms = planned.iter().map(|p| p.hold_ms).sum();
    PlaybackPlan {
        legs: planned,
        ending,
        total_ms,
    }
}
