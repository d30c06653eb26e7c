use std::collections::VecDeque;
use std::time::{Duration, Instant};


/// Throughput meter over a monotonically growing counter. Keeps a sliding
/// window of samples and reports the average speed across it.
pub struct Progress {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    current: u64,
}


impl Progress {
    pub fn new(window: Duration) -> Self {
        assert!(!window.is_zero());
        Self {
            samples: VecDeque::new(),
            window,
            current: 0,
        }
    }

    pub fn update(&mut self, value: u64) {
        let now = Instant::now();
        // concurrent batches may report out of order
        let value = self.current.max(value);
        self.current = value;
        self.samples.push_back((now, value));

        if let Some(horizon) = now.checked_sub(self.window) {
            while self.samples.len() > 2 {
                match self.samples.front() {
                    Some((time, _)) if *time < horizon => {
                        self.samples.pop_front();
                    }
                    _ => break,
                }
            }
        }
    }

    pub fn value(&self) -> u64 {
        self.current
    }

    pub fn speed(&self) -> f64 {
        let (Some((first_time, first_value)), Some((last_time, last_value))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0
        };
        let elapsed = last_time.duration_since(*first_time).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0
        }
        (last_value - first_value) as f64 / elapsed
    }
}
