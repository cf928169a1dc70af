use serde::Serialize;

/// Phrases cycled through by [`ClassifierService::benchmark`](super::ClassifierService::benchmark).
pub const DEFAULT_BENCHMARK_PHRASES: &[&str] = &[
    "What's the weather like?",
    "What time is it?",
    "Hello there",
    "Play some music",
    "Show me my calendar",
    "What's in the news?",
    "Help me with this",
    "Good morning",
    "Is it going to rain?",
    "Play my favorite song",
    "What's on my schedule?",
    "Tell me a joke",
    "How's the weather today?",
    "What's the current time?",
    "Hi there",
    "Turn on the radio",
    "Check my appointments",
    "What's happening in the world?",
    "What can you do?",
    "Good evening",
];

/// Latency and confidence statistics over one benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub iterations: usize,
    /// Lower-middle element of the sorted latencies
    pub median_ms: u64,
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    /// Element at `round(0.95 * (n - 1))` of the sorted latencies
    pub p95_ms: u64,
    pub average_confidence: f32,
}

impl BenchmarkResult {
    /// Aggregates per-call latencies (ms) and confidences.
    ///
    /// Returns `None` when no samples were collected.
    pub fn from_samples(latencies: &[u64], confidences: &[f32]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        let n = latencies.len();
        let mut sorted = latencies.to_vec();
        sorted.sort_unstable();

        let average_ms = latencies.iter().map(|&ms| ms as f64).sum::<f64>() / n as f64;
        let average_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        Some(Self {
            iterations: n,
            median_ms: sorted[(n - 1) / 2],
            average_ms,
            min_ms: sorted[0],
            max_ms: sorted[n - 1],
            p95_ms: sorted[percentile_index(0.95, n)],
            average_confidence,
        })
    }
}

fn percentile_index(fraction: f64, n: usize) -> usize {
    let index = (fraction * (n - 1) as f64).round() as usize;
    index.min(n - 1)
}
