// src/filter.rs

/// First-order low-pass filter: `x += k * (sample - x)` with
/// `k = dt / (ts + dt)`.
#[derive(Debug, Clone)]
pub struct FirstOrderFilter {
    x: f32,
    k: f32,
}

impl FirstOrderFilter {
    pub fn new(x0: f32, ts: f32, dt: f32) -> Self {
        Self {
            x: x0,
            k: dt / (ts + dt),
        }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        self.x += self.k * (sample - self.x);
        self.x
    }

    pub fn value(&self) -> f32 {
        self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_to_constant_input() {
        let mut f = FirstOrderFilter::new(50.0, 10.0, 0.05);
        for _ in 0..4000 {
            f.update(10.0);
        }
        assert!((f.value() - 10.0).abs() < 0.5, "settled at {}", f.value());
    }

    #[test]
    fn test_moves_toward_sample_each_step() {
        let mut f = FirstOrderFilter::new(0.0, 10.0, 0.05);
        let before = f.value();
        let after = f.update(100.0);
        assert!(after > before);
        assert!(after < 100.0);
    }
}
