use crate::sensor::Reading;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
}

/// Fixed-capacity FIFO of the most recent raw values for one pollutant.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn push(&mut self, value: f64) {
        while self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Mean of the values currently held; `None` before the first push.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One rolling window per pollutant, all sharing the same capacity.
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    pm25: RollingWindow,
    pm10: RollingWindow,
}

impl WindowAggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            pm25: RollingWindow::new(capacity),
            pm10: RollingWindow::new(capacity),
        }
    }

    pub fn push(&mut self, pollutant: Pollutant, value: f64) {
        self.window_mut(pollutant).push(value);
    }

    pub fn push_reading(&mut self, reading: &Reading) {
        self.push(Pollutant::Pm25, reading.pm25);
        self.push(Pollutant::Pm10, reading.pm10);
    }

    pub fn average(&self, pollutant: Pollutant) -> Option<f64> {
        self.window(pollutant).average()
    }

    pub fn window(&self, pollutant: Pollutant) -> &RollingWindow {
        match pollutant {
            Pollutant::Pm25 => &self.pm25,
            Pollutant::Pm10 => &self.pm10,
        }
    }

    fn window_mut(&mut self, pollutant: Pollutant) -> &mut RollingWindow {
        match pollutant {
            Pollutant::Pm25 => &mut self.pm25,
            Pollutant::Pm10 => &mut self.pm10,
        }
    }
}
