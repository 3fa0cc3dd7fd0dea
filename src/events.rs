use std::collections::VecDeque;

/// Where and how strongly something happened, plus how long the renderer should keep drawing it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventSpot {
    pub x: f32,
    pub y: f32,
    pub intensity: f32,
    /// Remaining lifetime in seconds.
    pub ttl: f32,
}

impl EventSpot {
    pub fn new(x: f32, y: f32, intensity: f32, ttl: f32) -> Self {
        Self {
            x,
            y,
            intensity: intensity.clamp(0.0, 1.0),
            ttl,
        }
    }
}

/// Transient effects emitted by the engines for the renderer to draw and fade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisualEvent {
    /// Lenia consumed a Life cell.
    Feeding(EventSpot),
    /// A glider consumed Lenia density.
    Predation(EventSpot),
    /// A sandpile cell toppled.
    Topple(EventSpot),
}

impl VisualEvent {
    pub fn spot(&self) -> &EventSpot {
        match self {
            Self::Feeding(s) | Self::Predation(s) | Self::Topple(s) => s,
        }
    }

    fn spot_mut(&mut self) -> &mut EventSpot {
        match self {
            Self::Feeding(s) | Self::Predation(s) | Self::Topple(s) => s,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Feeding(_) => "feeding",
            Self::Predation(_) => "predation",
            Self::Topple(_) => "topple",
        }
    }
}

/// Bounded event queue; the oldest entries are dropped once `cap` is reached.
#[derive(Clone, Debug)]
pub struct EventLog {
    events: VecDeque<VisualEvent>,
    cap: usize,
}

impl EventLog {
    pub fn new(cap: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(cap.min(1024)),
            cap: cap.max(1),
        }
    }

    pub fn push(&mut self, ev: VisualEvent) {
        while self.events.len() >= self.cap {
            self.events.pop_front();
        }
        self.events.push_back(ev);
    }

    /// Ages every event by `dt` and drops the expired ones.
    pub fn fade(&mut self, dt: f32) {
        for ev in &mut self.events {
            ev.spot_mut().ttl -= dt;
        }
        self.events.retain(|ev| ev.spot().ttl > 0.0);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Live events, oldest first.
    pub fn entries(&self) -> &VecDeque<VisualEvent> {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
