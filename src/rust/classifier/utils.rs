use ndarray::Array1;

pub(crate) fn normalize_vector<T>(vec: &Array1<T>) -> Array1<T>
where
    T: ndarray::NdFloat,
{
    let norm = vec.iter().map(|&x| x * x).fold(T::zero(), |acc, x| acc + x).sqrt();
    if norm > T::zero() {
        vec / norm
    } else {
        Array1::zeros(vec.len())
    }
}

#[cfg(feature = "onnx")]
pub(crate) fn average_vectors(vectors: &[Array1<f32>], embedding_size: usize) -> Array1<f32> {
    if vectors.is_empty() {
        return Array1::zeros(embedding_size);
    }
    let sum = vectors.iter().fold(Array1::zeros(vectors[0].len()), |acc, v| acc + v);
    sum / vectors.len() as f32
}

/// Numerically stable softmax over raw scores.
pub(crate) fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Index of the largest value. Ties resolve to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_vector() {
        let v = normalize_vector(&array![3.0f64, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);

        let zero = normalize_vector(&array![0.0f64, 0.0]);
        assert_eq!(zero, array![0.0, 0.0]);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1000.0, 1001.0, -5.0]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(probs.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn test_argmax_ties_prefer_first() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.2, 0.3, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
