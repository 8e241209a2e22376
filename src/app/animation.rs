//! Fixed-rate tickers driven by frame time. The physics step and the edge
//! flow each own one, so edge flow keeps moving after the layout settles.

const TICK_EPSILON: f32 = 1.0e-6;
const FLOW_STEP: f32 = 0.8;
// Common multiple of every edge dash period; keeps the offset small.
const FLOW_WRAP: f32 = 120.0;

#[derive(Clone, Debug)]
pub(in crate::app) struct Ticker {
    interval: f32,
    accumulator: f32,
    max_steps: u32,
    cancelled: bool,
}

impl Ticker {
    pub(in crate::app) fn new(rate_hz: f32, max_steps: u32) -> Self {
        Self {
            interval: 1.0 / rate_hz.max(1.0),
            accumulator: 0.0,
            max_steps: max_steps.max(1),
            cancelled: false,
        }
    }

    /// Number of ticks due after `delta_seconds`. Backlog beyond
    /// `max_steps` is dropped rather than replayed.
    pub(in crate::app) fn advance(&mut self, delta_seconds: f32) -> u32 {
        if self.cancelled || !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return 0;
        }

        self.accumulator += delta_seconds;
        let mut ticks = 0;
        while self.accumulator + TICK_EPSILON >= self.interval && ticks < self.max_steps {
            self.accumulator -= self.interval;
            ticks += 1;
        }
        if ticks == self.max_steps {
            self.accumulator = self.accumulator.min(self.interval);
        }
        self.accumulator = self.accumulator.max(0.0);
        ticks
    }

    pub(in crate::app) fn cancel(&mut self) {
        self.cancelled = true;
        self.accumulator = 0.0;
    }

    pub(in crate::app) fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

#[derive(Clone, Debug)]
pub(in crate::app) struct FlowAnimation {
    ticker: Ticker,
    offset: f32,
}

impl FlowAnimation {
    pub(in crate::app) fn new() -> Self {
        Self {
            ticker: Ticker::new(60.0, 8),
            offset: 0.0,
        }
    }

    pub(in crate::app) fn advance(&mut self, delta_seconds: f32) -> u32 {
        let ticks = self.ticker.advance(delta_seconds);
        self.offset = (self.offset - FLOW_STEP * ticks as f32) % FLOW_WRAP;
        ticks
    }

    pub(in crate::app) fn offset(&self) -> f32 {
        self.offset
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct FrameTicks {
    pub(in crate::app) physics: u32,
    pub(in crate::app) flow: u32,
}

#[derive(Clone, Debug)]
pub(in crate::app) struct AnimationClock {
    physics: Ticker,
    flow: FlowAnimation,
}

impl AnimationClock {
    pub(in crate::app) fn new() -> Self {
        Self {
            physics: Ticker::new(60.0, 4),
            flow: FlowAnimation::new(),
        }
    }

    pub(in crate::app) fn advance(&mut self, delta_seconds: f32) -> FrameTicks {
        FrameTicks {
            physics: self.physics.advance(delta_seconds),
            flow: self.flow.advance(delta_seconds),
        }
    }

    pub(in crate::app) fn flow_offset(&self) -> f32 {
        self.flow.offset()
    }

    /// Cancels both schedules together.
    pub(in crate::app) fn cancel(&mut self) {
        self.physics.cancel();
        self.flow.ticker.cancel();
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        !self.physics.is_cancelled() || !self.flow.ticker.is_cancelled()
    }
}
