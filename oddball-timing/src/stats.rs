use std::time::Duration;

/// Summary of measured onset-to-onset intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DwellStats {
    pub samples: usize,
    pub mean_ns: f64,
    /// Population standard deviation.
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

impl DwellStats {
    pub fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let mean = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            mean_ns: mean,
            jitter_ns: var.sqrt(),
            min_ns: min,
            max_ns: max,
        }
    }

    /// Largest absolute deviation from `nominal`, in nanoseconds.
    pub fn worst_drift_ns(&self, nominal: Duration) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        let nominal = nominal.as_nanos() as f64;
        (self.max_ns - nominal).abs().max((self.min_ns - nominal).abs())
    }
}
