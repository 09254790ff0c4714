/// Trailing-edge debounce: fires once, `delay_ms` after the last call.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms: delay_ms.max(0.0),
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Rate limit with a trailing call: a request inside the interval is
/// remembered and released by `poll` once the interval has passed.
#[derive(Clone, Copy, Debug)]
pub struct Throttle {
    interval_ms: f64,
    last_fire_ms: Option<f64>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            last_fire_ms: None,
            pending: false,
        }
    }

    fn ready(&self, now_ms: f64) -> bool {
        self.last_fire_ms
            .map(|last| now_ms - last >= self.interval_ms)
            .unwrap_or(true)
    }

    pub fn request(&mut self, now_ms: f64) -> bool {
        if self.ready(now_ms) {
            self.last_fire_ms = Some(now_ms);
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    pub fn poll(&mut self, now_ms: f64) -> bool {
        if self.pending && self.ready(now_ms) {
            self.last_fire_ms = Some(now_ms);
            self.pending = false;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.last_fire_ms = None;
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_coalesces_bursts() {
        let mut debounce = Debouncer::new(300.0);
        debounce.schedule(0.0);
        debounce.schedule(100.0);
        debounce.schedule(200.0);
        assert!(!debounce.poll(400.0));
        assert!(debounce.poll(500.0));
        assert!(!debounce.poll(900.0));
    }

    #[test]
    fn throttle_releases_trailing_request() {
        let mut throttle = Throttle::new(100.0);
        assert!(throttle.request(0.0));
        assert!(!throttle.request(30.0));
        assert!(!throttle.request(60.0));
        assert!(!throttle.poll(90.0));
        assert!(throttle.poll(100.0));
        assert!(!throttle.poll(250.0));
    }
}
