// projeto: extratotrain
// file: src/neural/model.rs
// Embedding + stacked LSTM + dense text classifier with backpropagation through time

use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use ndarray_stats::QuantileExt;
use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Instant;
use crate::neural::metrics::{EpochMetrics, TrainingHistory};
use crate::neural::utils::{
    add_outer, glorot_uniform, orthogonal, relu, sigmoid, softmax, sparse_categorical_crossentropy,
    tanh, uniform, AdamOptimizer, TrainingError,
};
use crate::neural::vectorizer::PAD_ID;

const EMBEDDING_INIT_LIMIT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub vocab_size: usize,
    pub embedding_dim: usize,
    /// Units of each recurrent layer; all but the last return full sequences.
    pub lstm_units: Vec<usize>,
    pub dense_units: usize,
    pub num_classes: usize,
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.vocab_size < 2 || self.embedding_dim == 0 || self.dense_units == 0 {
            return Err(TrainingError::ModelConfiguration(format!(
                "Invalid sizes: vocab_size={}, embedding_dim={}, dense_units={}",
                self.vocab_size, self.embedding_dim, self.dense_units
            )));
        }
        if self.lstm_units.is_empty() || self.lstm_units.contains(&0) {
            return Err(TrainingError::ModelConfiguration(format!(
                "At least one recurrent layer with positive units is required, got {:?}",
                self.lstm_units
            )));
        }
        if self.num_classes == 0 {
            return Err(TrainingError::ModelConfiguration(
                "The output layer needs at least one class".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fused LSTM parameters, gates stacked as input, forget, cell, output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayerWeights {
    pub w_ih: Array2<f64>, // (4 * units, input)
    pub w_hh: Array2<f64>, // (4 * units, units)
    pub b: Array1<f64>,    // (4 * units)
}

impl LstmLayerWeights {
    fn new<R: Rng>(input_size: usize, units: usize, rng: &mut R) -> Self {
        let mut b = Array1::zeros(4 * units);
        b.slice_mut(s![units..2 * units]).fill(1.0);
        LstmLayerWeights {
            w_ih: glorot_uniform(4 * units, input_size, rng),
            w_hh: orthogonal(4 * units, units, rng),
            b,
        }
    }

    fn zeros_like(&self) -> Self {
        LstmLayerWeights {
            w_ih: Array2::zeros(self.w_ih.raw_dim()),
            w_hh: Array2::zeros(self.w_hh.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    pub fn units(&self) -> usize {
        self.w_hh.ncols()
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    fn add_assign(&mut self, other: &Self) {
        self.w_ih += &other.w_ih;
        self.w_hh += &other.w_hh;
        self.b += &other.b;
    }

    fn scale(&mut self, factor: f64) {
        self.w_ih *= factor;
        self.w_hh *= factor;
        self.b *= factor;
    }

    fn len(&self) -> usize {
        self.w_ih.len() + self.w_hh.len() + self.b.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerWeights {
    pub w: Array2<f64>, // (units, input)
    pub b: Array1<f64>,
}

impl DenseLayerWeights {
    fn new<R: Rng>(input_size: usize, units: usize, rng: &mut R) -> Self {
        DenseLayerWeights {
            w: glorot_uniform(units, input_size, rng),
            b: Array1::zeros(units),
        }
    }

    fn zeros_like(&self) -> Self {
        DenseLayerWeights {
            w: Array2::zeros(self.w.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }

    pub fn units(&self) -> usize {
        self.w.nrows()
    }

    fn add_assign(&mut self, other: &Self) {
        self.w += &other.w;
        self.b += &other.b;
    }

    fn scale(&mut self, factor: f64) {
        self.w *= factor;
        self.b *= factor;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub embedding: Array2<f64>, // (vocab_size, embedding_dim)
    pub lstm_layers: Vec<LstmLayerWeights>,
    pub hidden_layer: DenseLayerWeights,
    pub output_layer: DenseLayerWeights,
}

/// Activations of one recurrent layer kept for the backward pass. Row 0 of
/// `hidden` and `cell` is the zero initial state.
struct LstmCache {
    inputs: Array2<f64>,
    hidden: Array2<f64>,
    cell: Array2<f64>,
    gates: Array2<f64>,
}

impl LstmCache {
    fn outputs(&self) -> ArrayView2<'_, f64> {
        self.hidden.slice(s![1.., ..])
    }

    fn final_hidden(&self) -> ArrayView1<'_, f64> {
        self.hidden.row(self.hidden.nrows() - 1)
    }
}

struct ForwardPass {
    tokens: Vec<usize>,
    lstm: Vec<LstmCache>,
    final_state: Array1<f64>,
    hidden_pre: Array1<f64>,
    hidden_act: Array1<f64>,
    probs: Array1<f64>,
}

/// Summed gradients of a group of samples. Embedding rows are sparse: only
/// rows of tokens that occurred are present.
pub struct Gradients {
    embedding: HashMap<usize, Array1<f64>>,
    lstm_layers: Vec<LstmLayerWeights>,
    hidden_layer: DenseLayerWeights,
    output_layer: DenseLayerWeights,
    pub loss: f64,
    pub correct: usize,
    pub samples: usize,
}

impl Gradients {
    fn zeros(weights: &ModelWeights) -> Self {
        Gradients {
            embedding: HashMap::new(),
            lstm_layers: weights.lstm_layers.iter().map(LstmLayerWeights::zeros_like).collect(),
            hidden_layer: weights.hidden_layer.zeros_like(),
            output_layer: weights.output_layer.zeros_like(),
            loss: 0.0,
            correct: 0,
            samples: 0,
        }
    }

    fn merge(mut self, other: Gradients) -> Self {
        for (id, grad) in other.embedding {
            match self.embedding.entry(id) {
                Entry::Occupied(mut entry) => *entry.get_mut() += &grad,
                Entry::Vacant(entry) => {
                    entry.insert(grad);
                }
            }
        }
        for (mine, theirs) in self.lstm_layers.iter_mut().zip(&other.lstm_layers) {
            mine.add_assign(theirs);
        }
        self.hidden_layer.add_assign(&other.hidden_layer);
        self.output_layer.add_assign(&other.output_layer);
        self.loss += other.loss;
        self.correct += other.correct;
        self.samples += other.samples;
        self
    }

    fn scale(&mut self, factor: f64) {
        for grad in self.embedding.values_mut() {
            *grad *= factor;
        }
        for layer in &mut self.lstm_layers {
            layer.scale(factor);
        }
        self.hidden_layer.scale(factor);
        self.output_layer.scale(factor);
    }
}

pub struct TextClassifier {
    config: ClassifierConfig,
    weights: ModelWeights,
}

impl TextClassifier {
    pub fn new<R: Rng>(config: ClassifierConfig, rng: &mut R) -> Result<Self, TrainingError> {
        config.validate()?;
        info!(
            "🛠️ [Model] Embedding({}→{}) → LSTM{:?} → Dense({}, relu) → Dense({}, softmax)",
            config.vocab_size, config.embedding_dim, config.lstm_units, config.dense_units, config.num_classes
        );
        if config.num_classes == 1 {
            warn!("⚠️ [Model] Only one class: the softmax output has width 1 and training is meaningless");
        }

        let embedding = uniform(config.vocab_size, config.embedding_dim, EMBEDDING_INIT_LIMIT, rng);
        let mut lstm_layers = Vec::with_capacity(config.lstm_units.len());
        let mut input_size = config.embedding_dim;
        for &units in &config.lstm_units {
            lstm_layers.push(LstmLayerWeights::new(input_size, units, rng));
            input_size = units;
        }
        let hidden_layer = DenseLayerWeights::new(input_size, config.dense_units, rng);
        let output_layer = DenseLayerWeights::new(config.dense_units, config.num_classes, rng);

        let model = TextClassifier {
            config,
            weights: ModelWeights { embedding, lstm_layers, hidden_layer, output_layer },
        };
        info!("✅ [Model] Initialized with {} parameters", model.num_parameters());
        Ok(model)
    }

    /// Rebuilds a classifier from saved weights, checking every shape
    /// against the configuration.
    pub fn from_weights(config: ClassifierConfig, weights: ModelWeights) -> Result<Self, TrainingError> {
        config.validate()?;

        let mismatch = |what: &str, expected: String, got: String| {
            Err(TrainingError::ModelConfiguration(format!(
                "{}: expected {}, got {}",
                what, expected, got
            )))
        };

        let embedding_dim = (config.vocab_size, config.embedding_dim);
        if weights.embedding.dim() != embedding_dim {
            return mismatch("embedding", format!("{:?}", embedding_dim), format!("{:?}", weights.embedding.dim()));
        }
        if weights.lstm_layers.len() != config.lstm_units.len() {
            return mismatch(
                "recurrent layer count",
                config.lstm_units.len().to_string(),
                weights.lstm_layers.len().to_string(),
            );
        }
        let mut input_size = config.embedding_dim;
        for (idx, (layer, &units)) in weights.lstm_layers.iter().zip(&config.lstm_units).enumerate() {
            let ok = layer.w_ih.dim() == (4 * units, input_size)
                && layer.w_hh.dim() == (4 * units, units)
                && layer.b.len() == 4 * units;
            if !ok {
                return mismatch(
                    &format!("lstm_{}", idx),
                    format!("{} units over {} inputs", units, input_size),
                    format!("w_ih {:?}, w_hh {:?}", layer.w_ih.dim(), layer.w_hh.dim()),
                );
            }
            input_size = units;
        }
        let dense = &weights.hidden_layer;
        if dense.w.dim() != (config.dense_units, input_size) || dense.b.len() != config.dense_units {
            return mismatch("dense", format!("({}, {})", config.dense_units, input_size), format!("{:?}", dense.w.dim()));
        }
        let output = &weights.output_layer;
        if output.w.dim() != (config.num_classes, config.dense_units) || output.b.len() != config.num_classes {
            return mismatch("output", format!("({}, {})", config.num_classes, config.dense_units), format!("{:?}", output.w.dim()));
        }

        Ok(TextClassifier { config, weights })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn weights(&self) -> &ModelWeights {
        &self.weights
    }

    pub fn num_classes(&self) -> usize {
        self.weights.output_layer.units()
    }

    pub fn num_parameters(&self) -> usize {
        let mut count = self.weights.embedding.len();
        count += self.weights.lstm_layers.iter().map(LstmLayerWeights::len).sum::<usize>();
        count += self.weights.hidden_layer.w.len() + self.weights.hidden_layer.b.len();
        count += self.weights.output_layer.w.len() + self.weights.output_layer.b.len();
        count
    }

    fn forward(&self, tokens: ArrayView1<usize>) -> Result<ForwardPass, TrainingError> {
        // padding positions are skipped, recurrent state carries across them
        let active: Vec<usize> = tokens.iter().copied().filter(|&id| id != PAD_ID).collect();

        let mut inputs = Array2::zeros((active.len(), self.config.embedding_dim));
        for (t, &id) in active.iter().enumerate() {
            if id >= self.config.vocab_size {
                return Err(TrainingError::DataProcessing(format!(
                    "Token id {} outside embedding of size {}",
                    id, self.config.vocab_size
                )));
            }
            inputs.row_mut(t).assign(&self.weights.embedding.row(id));
        }

        let mut caches: Vec<LstmCache> = Vec::with_capacity(self.weights.lstm_layers.len());
        let mut layer_input = inputs;
        for layer in &self.weights.lstm_layers {
            let cache = Self::forward_lstm_layer(layer, layer_input);
            layer_input = cache.outputs().to_owned();
            caches.push(cache);
        }

        let final_state = caches
            .last()
            .map(|cache| cache.final_hidden().to_owned())
            .ok_or_else(|| TrainingError::ModelConfiguration("Model has no recurrent layer".to_string()))?;

        let hidden_pre = self.weights.hidden_layer.w.dot(&final_state) + &self.weights.hidden_layer.b;
        let hidden_act = relu(&hidden_pre);
        let logits = self.weights.output_layer.w.dot(&hidden_act) + &self.weights.output_layer.b;
        let probs = softmax(&logits);

        Ok(ForwardPass { tokens: active, lstm: caches, final_state, hidden_pre, hidden_act, probs })
    }

    fn forward_lstm_layer(layer: &LstmLayerWeights, inputs: Array2<f64>) -> LstmCache {
        let steps = inputs.nrows();
        let h = layer.units();
        let mut hidden = Array2::zeros((steps + 1, h));
        let mut cell = Array2::zeros((steps + 1, h));
        let mut gates = Array2::zeros((steps, 4 * h));

        for t in 0..steps {
            let z = layer.w_ih.dot(&inputs.row(t)) + &layer.w_hh.dot(&hidden.row(t)) + &layer.b;

            let i_t = sigmoid(&z.slice(s![..h]).to_owned());
            let f_t = sigmoid(&z.slice(s![h..2 * h]).to_owned());
            let g_t = tanh(&z.slice(s![2 * h..3 * h]).to_owned());
            let o_t = sigmoid(&z.slice(s![3 * h..]).to_owned());

            let c_t = &f_t * &cell.row(t) + &(&i_t * &g_t);
            let h_t = &o_t * &tanh(&c_t);

            cell.row_mut(t + 1).assign(&c_t);
            hidden.row_mut(t + 1).assign(&h_t);

            let mut gate_row = gates.row_mut(t);
            gate_row.slice_mut(s![..h]).assign(&i_t);
            gate_row.slice_mut(s![h..2 * h]).assign(&f_t);
            gate_row.slice_mut(s![2 * h..3 * h]).assign(&g_t);
            gate_row.slice_mut(s![3 * h..]).assign(&o_t);
        }

        LstmCache { inputs, hidden, cell, gates }
    }

    /// Backpropagation through time for one layer. `d_outputs` holds the
    /// loss gradient w.r.t. every hidden output; returns the gradient
    /// w.r.t. the layer inputs and accumulates parameter gradients.
    fn backward_lstm_layer(
        layer: &LstmLayerWeights,
        cache: &LstmCache,
        d_outputs: &Array2<f64>,
        grads: &mut LstmLayerWeights,
    ) -> Array2<f64> {
        let steps = cache.inputs.nrows();
        let h = layer.units();
        let mut d_inputs = Array2::zeros((steps, layer.input_size()));
        let mut dh_next = Array1::<f64>::zeros(h);
        let mut dc_next = Array1::<f64>::zeros(h);

        for t in (0..steps).rev() {
            let gates = cache.gates.row(t);
            let i_t = gates.slice(s![..h]);
            let f_t = gates.slice(s![h..2 * h]);
            let g_t = gates.slice(s![2 * h..3 * h]);
            let o_t = gates.slice(s![3 * h..]);
            let c_prev = cache.cell.row(t);
            let tanh_c = cache.cell.row(t + 1).mapv(f64::tanh);

            let dh = &d_outputs.row(t) + &dh_next;
            let d_o = &dh * &tanh_c;
            let dc = &dh * &o_t * &tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;

            let d_i = &dc * &g_t;
            let d_f = &dc * &c_prev;
            let d_g = &dc * &i_t;
            dc_next = &dc * &f_t;

            let mut d_z = Array1::<f64>::zeros(4 * h);
            d_z.slice_mut(s![..h]).assign(&(&d_i * &i_t.mapv(|v| v * (1.0 - v))));
            d_z.slice_mut(s![h..2 * h]).assign(&(&d_f * &f_t.mapv(|v| v * (1.0 - v))));
            d_z.slice_mut(s![2 * h..3 * h]).assign(&(&d_g * &g_t.mapv(|v| 1.0 - v * v)));
            d_z.slice_mut(s![3 * h..]).assign(&(&d_o * &o_t.mapv(|v| v * (1.0 - v))));

            add_outer(&mut grads.w_ih, d_z.view(), cache.inputs.row(t));
            add_outer(&mut grads.w_hh, d_z.view(), cache.hidden.row(t));
            grads.b += &d_z;

            d_inputs.row_mut(t).assign(&layer.w_ih.t().dot(&d_z));
            dh_next = layer.w_hh.t().dot(&d_z);
        }

        d_inputs
    }

    fn sample_gradients(&self, tokens: ArrayView1<usize>, label: usize) -> Result<Gradients, TrainingError> {
        let pass = self.forward(tokens)?;
        let mut grads = Gradients::zeros(&self.weights);
        grads.loss = sparse_categorical_crossentropy(&pass.probs, label);
        grads.correct = usize::from(argmax(&pass.probs)? == label);
        grads.samples = 1;

        // softmax + cross-entropy
        let mut d_logits = pass.probs.clone();
        d_logits[label] -= 1.0;
        add_outer(&mut grads.output_layer.w, d_logits.view(), pass.hidden_act.view());
        grads.output_layer.b += &d_logits;

        let d_act = self.weights.output_layer.w.t().dot(&d_logits);
        let d_pre = &d_act * &pass.hidden_pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        add_outer(&mut grads.hidden_layer.w, d_pre.view(), pass.final_state.view());
        grads.hidden_layer.b += &d_pre;

        let steps = pass.tokens.len();
        if steps == 0 {
            return Ok(grads);
        }

        let d_state = self.weights.hidden_layer.w.t().dot(&d_pre);
        let mut d_outputs = Array2::zeros((steps, d_state.len()));
        d_outputs.row_mut(steps - 1).assign(&d_state);

        for (idx, layer) in self.weights.lstm_layers.iter().enumerate().rev() {
            d_outputs = Self::backward_lstm_layer(layer, &pass.lstm[idx], &d_outputs, &mut grads.lstm_layers[idx]);
        }

        for (t, &id) in pass.tokens.iter().enumerate() {
            grads.embedding
                .entry(id)
                .and_modify(|g| *g += &d_outputs.row(t))
                .or_insert_with(|| d_outputs.row(t).to_owned());
        }

        Ok(grads)
    }

    /// Summed gradients over the rows `batch` of `sequences`. Samples run in
    /// parallel; the sum is taken in batch order so results are reproducible.
    pub fn compute_gradients(
        &self,
        sequences: &Array2<usize>,
        labels: &[usize],
        batch: &[usize],
    ) -> Result<Gradients, TrainingError> {
        let per_sample = batch
            .par_iter()
            .map(|&idx| self.sample_gradients(sequences.row(idx), labels[idx]))
            .collect::<Result<Vec<Gradients>, TrainingError>>()?;
        Ok(per_sample
            .into_iter()
            .fold(Gradients::zeros(&self.weights), Gradients::merge))
    }

    fn apply_gradients(&mut self, mut grads: Gradients, optimizer: &mut AdamOptimizer) -> Result<(), TrainingError> {
        if grads.samples == 0 {
            return Ok(());
        }
        grads.scale(1.0 / grads.samples as f64);

        let mut d_embedding = Array2::zeros(self.weights.embedding.raw_dim());
        for (&id, grad) in &grads.embedding {
            let mut row = d_embedding.row_mut(id);
            row += grad;
        }

        optimizer.begin_step();
        optimizer.update("embedding", &mut self.weights.embedding, &d_embedding)?;
        for (idx, (layer, grad)) in self.weights.lstm_layers.iter_mut().zip(&grads.lstm_layers).enumerate() {
            optimizer.update(&format!("lstm_{}_w_ih", idx), &mut layer.w_ih, &grad.w_ih)?;
            optimizer.update(&format!("lstm_{}_w_hh", idx), &mut layer.w_hh, &grad.w_hh)?;
            optimizer.update(&format!("lstm_{}_b", idx), &mut layer.b, &grad.b)?;
        }
        optimizer.update("dense_w", &mut self.weights.hidden_layer.w, &grads.hidden_layer.w)?;
        optimizer.update("dense_b", &mut self.weights.hidden_layer.b, &grads.hidden_layer.b)?;
        optimizer.update("output_w", &mut self.weights.output_layer.w, &grads.output_layer.w)?;
        optimizer.update("output_b", &mut self.weights.output_layer.b, &grads.output_layer.b)?;
        Ok(())
    }

    /// One pass over the training set in shuffled mini-batches. Returns the
    /// mean loss and accuracy observed while training.
    pub fn train_epoch<R: Rng>(
        &mut self,
        sequences: &Array2<usize>,
        labels: &[usize],
        batch_size: usize,
        optimizer: &mut AdamOptimizer,
        rng: &mut R,
    ) -> Result<(f64, f64), TrainingError> {
        let mut order: Vec<usize> = (0..sequences.nrows()).collect();
        order.shuffle(rng);

        let (mut total_loss, mut correct, mut seen) = (0.0, 0usize, 0usize);
        for batch in order.chunks(batch_size) {
            let grads = self.compute_gradients(sequences, labels, batch)?;
            total_loss += grads.loss;
            correct += grads.correct;
            seen += grads.samples;
            self.apply_gradients(grads, optimizer)?;
        }

        let seen = seen.max(1) as f64;
        Ok((total_loss / seen, correct as f64 / seen))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fit<R: Rng>(
        &mut self,
        train_x: &Array2<usize>,
        train_y: &[usize],
        val_x: &Array2<usize>,
        val_y: &[usize],
        epochs: usize,
        batch_size: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<TrainingHistory, TrainingError> {
        if epochs == 0 || batch_size == 0 {
            return Err(TrainingError::Training(format!(
                "epochs ({}) and batch_size ({}) must be positive",
                epochs, batch_size
            )));
        }
        self.check_dataset(train_x, train_y, "train")?;
        self.check_dataset(val_x, val_y, "validation")?;

        let mut optimizer = AdamOptimizer::new(learning_rate, 0.9, 0.999, 1e-7);
        let mut history = TrainingHistory::new();
        info!(
            "🎓 [Model] Training on {} samples, validating on {} | {} epochs, batch {}",
            train_x.nrows(),
            val_x.nrows(),
            epochs,
            batch_size
        );

        for epoch in 1..=epochs {
            let epoch_start = Instant::now();
            let (loss, accuracy) = self.train_epoch(train_x, train_y, batch_size, &mut optimizer, rng)?;
            let (val_loss, val_accuracy) = self.evaluate(val_x, val_y)?;

            if !loss.is_finite() {
                return Err(TrainingError::Training(format!("Loss diverged at epoch {}", epoch)));
            }

            history.push(EpochMetrics {
                epoch,
                loss,
                accuracy,
                val_loss,
                val_accuracy,
                duration_secs: epoch_start.elapsed().as_secs_f64(),
            });
        }

        Ok(history)
    }

    /// Mean loss and accuracy over a labelled set.
    pub fn evaluate(&self, sequences: &Array2<usize>, labels: &[usize]) -> Result<(f64, f64), TrainingError> {
        self.check_dataset(sequences, labels, "evaluation")?;

        let results = (0..sequences.nrows())
            .into_par_iter()
            .map(|i| -> Result<(f64, bool), TrainingError> {
                let probs = self.predict_proba(sequences.row(i))?;
                Ok((sparse_categorical_crossentropy(&probs, labels[i]), argmax(&probs)? == labels[i]))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let n = results.len() as f64;
        let loss = results.iter().map(|(l, _)| l).sum::<f64>() / n;
        let accuracy = results.iter().filter(|(_, hit)| *hit).count() as f64 / n;
        debug!("🔍 [Model] Evaluated {} samples: loss={:.4} acc={:.4}", results.len(), loss, accuracy);
        Ok((loss, accuracy))
    }

    pub fn predict_proba(&self, tokens: ArrayView1<usize>) -> Result<Array1<f64>, TrainingError> {
        Ok(self.forward(tokens)?.probs)
    }

    pub fn predict_batch(&self, sequences: &Array2<usize>) -> Result<Vec<usize>, TrainingError> {
        (0..sequences.nrows())
            .into_par_iter()
            .map(|i| -> Result<usize, TrainingError> { argmax(&self.predict_proba(sequences.row(i))?) })
            .collect()
    }

    fn check_dataset(&self, sequences: &Array2<usize>, labels: &[usize], name: &str) -> Result<(), TrainingError> {
        if sequences.nrows() == 0 {
            return Err(TrainingError::DataProcessing(format!("{} set is empty", name)));
        }
        if sequences.nrows() != labels.len() {
            return Err(TrainingError::DataProcessing(format!(
                "{} set has {} sequences but {} labels",
                name,
                sequences.nrows(),
                labels.len()
            )));
        }
        let classes = self.num_classes();
        if let Some(&bad) = labels.iter().find(|&&l| l >= classes) {
            return Err(TrainingError::DataProcessing(format!(
                "{} label {} outside 0..{}",
                name, bad, classes
            )));
        }
        Ok(())
    }
}

fn argmax(probs: &Array1<f64>) -> Result<usize, TrainingError> {
    probs
        .argmax()
        .map_err(|e| TrainingError::Training(format!("Cannot take argmax of probabilities: {}", e)))
}
