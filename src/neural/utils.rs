// projeto: extratotrain
// file: src/neural/utils.rs
// Utility functions, optimizer, initializers and error handling

use ndarray::{Array, Array1, Array2, ArrayD, ArrayView1, Axis, Dimension, IxDyn, ShapeError, Zip};
use ndarray::linalg::general_mat_mul;
use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data processing error: {0}")]
    DataProcessing(String),

    #[error("Model configuration error: {0}")]
    ModelConfiguration(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Database error: {0}")]
    Database(#[from] postgres::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shape error: {0}")]
    Shape(String),
}

impl From<ShapeError> for TrainingError {
    fn from(err: ShapeError) -> Self {
        TrainingError::Shape(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        TrainingError::Serialization(err.to_string())
    }
}

/// Adam with bias-corrected step size. Moment buffers are keyed by parameter
/// name and created lazily on the first update of each parameter.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub t: usize,
    m: HashMap<String, ArrayD<f64>>,
    v: HashMap<String, ArrayD<f64>>,
}

impl AdamOptimizer {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        AdamOptimizer {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: HashMap::new(),
            v: HashMap::new(),
        }
    }

    /// Advances the step counter. Call once per batch, before the updates.
    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    pub fn update<D: Dimension>(
        &mut self,
        param_name: &str,
        param: &mut Array<f64, D>,
        gradient: &Array<f64, D>,
    ) -> Result<(), TrainingError> {
        if param.shape() != gradient.shape() {
            return Err(TrainingError::Shape(format!(
                "gradient for '{}' has shape {:?}, parameter has {:?}",
                param_name,
                gradient.shape(),
                param.shape()
            )));
        }

        let t = self.t.max(1) as i32;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let step_size =
            self.learning_rate * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));

        let shape = IxDyn(gradient.shape());
        let m = self.m.entry(param_name.to_string())
            .or_insert_with(|| ArrayD::zeros(shape.clone()));
        let v = self.v.entry(param_name.to_string())
            .or_insert_with(|| ArrayD::zeros(shape));

        Zip::from(param.view_mut().into_dyn())
            .and(gradient.view().into_dyn())
            .and(m.view_mut())
            .and(v.view_mut())
            .for_each(|p, &g, m, v| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *p -= step_size * *m / (v.sqrt() + epsilon);
            });

        Ok(())
    }
}

pub fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(sigmoid_scalar)
}

pub fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|val| val.tanh())
}

pub fn relu(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(relu_scalar)
}

pub fn sigmoid_scalar(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn relu_scalar(x: f64) -> f64 {
    x.max(0.0)
}

/// Numerically stable softmax.
pub fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Cross-entropy of one sample against an integer label, with the
/// probability clipped away from 0 and 1.
pub fn sparse_categorical_crossentropy(probs: &Array1<f64>, label: usize) -> f64 {
    const EPS: f64 = 1e-7;
    -probs[label].clamp(EPS, 1.0 - EPS).ln()
}

/// `target += col ⊗ row`
pub fn add_outer(target: &mut Array2<f64>, col: ArrayView1<f64>, row: ArrayView1<f64>) {
    let col = col.insert_axis(Axis(1));
    let row = row.insert_axis(Axis(0));
    general_mat_mul(1.0, &col, &row, 1.0, target);
}

/// Glorot/Xavier uniform initialization for a `(fan_out, fan_in)` matrix.
pub fn glorot_uniform<R: Rng>(fan_out: usize, fan_in: usize, rng: &mut R) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_fn((fan_out, fan_in), |_| rng.random_range(-limit..limit))
}

pub fn uniform<R: Rng>(rows: usize, cols: usize, limit: f64, rng: &mut R) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..limit))
}

/// Orthogonal initialization: the matrix has orthonormal columns when
/// `rows >= cols` and orthonormal rows otherwise.
pub fn orthogonal<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Array2<f64> {
    if rows < cols {
        return orthogonal(cols, rows, rng).reversed_axes();
    }

    let mut q: Array2<f64> = Array2::from_shape_fn((rows, cols), |_| rng.sample(StandardNormal));
    for j in 0..cols {
        for k in 0..j {
            let proj = q.column(j).dot(&q.column(k));
            let basis = q.column(k).to_owned();
            q.column_mut(j).scaled_add(-proj, &basis);
        }
        let norm = q.column(j).dot(&q.column(j)).sqrt().max(1e-12);
        q.column_mut(j).mapv_inplace(|x| x / norm);
    }
    q
}
