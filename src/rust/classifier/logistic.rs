use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::softmax;

/// Training parameters for multinomial logistic regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Training stops once the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 1.0,
            tolerance: 1e-6,
        }
    }
}

/// Softmax regression over dense feature vectors, trained by full-batch gradient descent.
///
/// Training starts from zero weights and uses no sampling, so the same data always
/// produces the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Shape `[n_classes, n_features]`
    weights: Array2<f64>,
    intercepts: Array1<f64>,
}

impl LogisticRegression {
    /// Fits the model. `targets[i]` is the class index of row `i` of `features`.
    pub fn fit(
        features: &Array2<f64>,
        targets: &[usize],
        n_classes: usize,
        config: &LogisticConfig,
    ) -> Result<Self, ClassifierError> {
        let (n_samples, n_features) = features.dim();
        if n_samples == 0 || n_samples != targets.len() {
            return Err(ClassifierError::Build(format!(
                "Expected one target per sample, got {} samples and {} targets",
                n_samples,
                targets.len()
            )));
        }
        if n_classes < 2 {
            return Err(ClassifierError::Build("At least two classes are required".into()));
        }
        if let Some(bad) = targets.iter().find(|&&t| t >= n_classes) {
            return Err(ClassifierError::Build(format!("Target {} is out of range", bad)));
        }
        if config.c <= 0.0 || config.learning_rate <= 0.0 {
            return Err(ClassifierError::Validation(
                "Regularization strength and learning rate must be positive".into(),
            ));
        }

        let mut one_hot = Array2::<f64>::zeros((n_samples, n_classes));
        for (row, &target) in targets.iter().enumerate() {
            one_hot[[row, target]] = 1.0;
        }

        let n = n_samples as f64;
        let mut weights = Array2::<f64>::zeros((n_classes, n_features));
        let mut intercepts = Array1::<f64>::zeros(n_classes);

        for iteration in 0..config.max_iter {
            let mut probabilities = features.dot(&weights.t()) + &intercepts;
            for mut row in probabilities.rows_mut() {
                let p = softmax(&row.to_vec());
                row.assign(&Array1::from(p));
            }

            let residuals = probabilities - &one_hot;
            let grad_weights = residuals.t().dot(features) / n + &weights / (config.c * n);
            let grad_intercepts = residuals.sum_axis(Axis(0)) / n;

            weights.scaled_add(-config.learning_rate, &grad_weights);
            intercepts.scaled_add(-config.learning_rate, &grad_intercepts);

            let largest = grad_weights
                .iter()
                .chain(grad_intercepts.iter())
                .fold(0.0f64, |acc, g| acc.max(g.abs()));
            if largest < config.tolerance {
                log::debug!("Logistic regression converged after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(Self { weights, intercepts })
    }

    /// Class probabilities for one feature vector.
    pub fn predict_proba(&self, features: ArrayView1<f64>) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.n_features() {
            return Err(ClassifierError::Internal(format!(
                "Feature vector has {} dimensions, model expects {}",
                features.len(),
                self.n_features()
            )));
        }
        let logits = self.weights.dot(&features) + &self.intercepts;
        Ok(softmax(&logits.to_vec()))
    }

    pub fn n_classes(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.weights.ncols()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.intercepts.len() != self.weights.nrows() {
            return Err(format!(
                "{} intercepts for {} weight rows",
                self.intercepts.len(),
                self.weights.nrows()
            ));
        }
        if self.weights.iter().chain(self.intercepts.iter()).any(|w| !w.is_finite()) {
            return Err("weights must be finite".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_problem() -> (Array2<f64>, Vec<usize>) {
        let x = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.9]];
        (x, vec![0, 0, 1, 1])
    }

    #[test]
    fn test_fit_separates_classes() {
        let (x, y) = toy_problem();
        let model = LogisticRegression::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        let p0 = model.predict_proba(array![1.0, 0.0].view()).unwrap();
        let p1 = model.predict_proba(array![0.0, 1.0].view()).unwrap();
        assert!(p0[0] > 0.5);
        assert!(p1[1] > 0.5);
        assert!((p0.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy_problem();
        let a = LogisticRegression::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        let b = LogisticRegression::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.intercepts, b.intercepts);
    }

    #[test]
    fn test_fit_rejects_bad_targets() {
        let (x, _) = toy_problem();
        assert!(LogisticRegression::fit(&x, &[0, 1], 2, &LogisticConfig::default()).is_err());
        assert!(LogisticRegression::fit(&x, &[0, 1, 2, 0], 2, &LogisticConfig::default()).is_err());
        assert!(LogisticRegression::fit(&x, &[0, 0, 0, 0], 1, &LogisticConfig::default()).is_err());
    }

    #[test]
    fn test_predict_rejects_wrong_dimensions() {
        let (x, y) = toy_problem();
        let model = LogisticRegression::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        assert!(matches!(
            model.predict_proba(array![1.0, 0.0, 0.0].view()),
            Err(ClassifierError::Internal(_))
        ));
    }
}
