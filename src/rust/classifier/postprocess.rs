use ndarray::Array1;
use serde::Serialize;

/// Index and probability of the winning class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub index: usize,
    pub value: f32,
}

/// Converts logits into probabilities.
///
/// The maximum logit is subtracted before exponentiating so large logits do
/// not overflow; adding a constant to every logit leaves the output unchanged.
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    if logits.is_empty() {
        return Array1::zeros(0);
    }
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Array1<f64> = logits.mapv(|x| (x as f64 - max).exp());
    let sum = exps.sum();
    if sum > 0.0 && sum.is_finite() {
        exps.mapv(|e| (e / sum) as f32)
    } else {
        // Only reachable with non-finite logits
        Array1::from_elem(logits.len(), 1.0 / logits.len() as f32)
    }
}

/// Returns the first maximal element. `None` for an empty vector.
pub fn argmax(probabilities: &Array1<f32>) -> Option<Prediction> {
    let mut best: Option<Prediction> = None;
    for (index, &value) in probabilities.iter().enumerate() {
        match best {
            Some(current) if !(value > current.value) => {}
            _ => best = Some(Prediction { index, value }),
        }
    }
    best
}
