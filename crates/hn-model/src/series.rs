//! Result buffers attached to output properties.
//!
//! Buffers are owned by whoever loaded the results (see `hn-engine`'s
//! `OutputStore`); properties only hold [`Weak`] handles to them.

use std::sync::{Arc, Weak};

/// One time series: shared time axis plus the values for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBuffer {
    pub times: Arc<Vec<f64>>,
    pub values: Vec<f64>,
}

impl SeriesBuffer {
    pub fn new(times: Arc<Vec<f64>>, values: Vec<f64>) -> Self {
        Self { times, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Value at a simulation time, linearly interpolated and clamped to the ends.
    pub fn value_at(&self, t: f64) -> Option<f64> {
        let n = self.values.len().min(self.times.len());
        if n == 0 {
            return None;
        }
        let times = &self.times[..n];
        if t <= times[0] {
            return Some(self.values[0]);
        }
        if t >= times[n - 1] {
            return Some(self.values[n - 1]);
        }
        let hi = times.partition_point(|&x| x <= t);
        let lo = hi - 1;
        let span = times[hi] - times[lo];
        if span <= 0.0 {
            return Some(self.values[lo]);
        }
        let w = (t - times[lo]) / span;
        Some(self.values[lo] + w * (self.values[hi] - self.values[lo]))
    }
}

/// Minimum and maximum of a series and when they occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub min: f64,
    pub max: f64,
    pub time_of_min: f64,
    pub time_of_max: f64,
}

impl Extremes {
    pub fn first(value: f64, time: f64) -> Self {
        Self {
            min: value,
            max: value,
            time_of_min: time,
            time_of_max: time,
        }
    }

    pub fn update(&mut self, value: f64, time: f64) {
        if value < self.min {
            self.min = value;
            self.time_of_min = time;
        }
        if value > self.max {
            self.max = value;
            self.time_of_max = time;
        }
    }

    pub fn of(times: &[f64], values: &[f64]) -> Option<Self> {
        let mut it = times.iter().zip(values.iter());
        let (&t0, &v0) = it.next()?;
        let mut ext = Self::first(v0, t0);
        for (&t, &v) in it {
            ext.update(v, t);
        }
        Some(ext)
    }
}

pub type SeriesRef = Weak<SeriesBuffer>;
pub type ExtremesRef = Weak<Extremes>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_track_times() {
        let ext = Extremes::of(&[0.0, 1.0, 2.0, 3.0], &[5.0, 9.0, -1.0, 4.0]).unwrap();
        assert_eq!(ext.min, -1.0);
        assert_eq!(ext.time_of_min, 2.0);
        assert_eq!(ext.max, 9.0);
        assert_eq!(ext.time_of_max, 1.0);
        assert!(Extremes::of(&[], &[]).is_none());
    }

    #[test]
    fn value_at_interpolates() {
        let s = SeriesBuffer::new(Arc::new(vec![0.0, 10.0]), vec![0.0, 100.0]);
        assert_eq!(s.value_at(2.5), Some(25.0));
        assert_eq!(s.value_at(-1.0), Some(0.0));
        assert_eq!(s.value_at(20.0), Some(100.0));
    }
}
