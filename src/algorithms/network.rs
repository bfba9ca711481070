use ndarray::{s, Array2, Axis};
use rand::Rng;

use crate::algorithms::initializer;
use crate::algorithms::optimizer::Optimizer;

/// Hidden layer widths of the rating predictor, applied in order after the
/// concatenated embedding input.
pub const HIDDEN_SIZES: [usize; 3] = [128, 64, 32];

#[derive(Debug, Clone)]
struct DenseLayer {
    // weights are (fan_out, fan_in) so forward is input . weights^T
    weights: Array2<f32>,
    bias: ndarray::Array1<f32>,
}

impl DenseLayer {
    fn new<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Self {
        Self {
            weights: initializer::xavier_uniform(rng, fan_in, fan_out),
            bias: initializer::zeros(fan_out),
        }
    }

    fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        input.dot(&self.weights.t()) + &self.bias
    }
}

struct ForwardPass {
    input: Array2<f32>,
    // pre-activation and post-ReLU values per hidden layer
    zs: Vec<Array2<f32>>,
    hs: Vec<Array2<f32>>,
    predictions: Array2<f32>,
}

/// Feed-forward rating predictor over learned user and product embeddings.
///
/// Each example concatenates one user and one product embedding, runs through
/// ReLU hidden layers and a linear output unit, and is trained against the
/// observed rating with mean squared error. Embedding tables are model
/// parameters and receive gradient updates like the dense layers.
#[derive(Debug, Clone)]
pub struct RatingNet {
    user_factors: Array2<f32>,
    product_factors: Array2<f32>,
    embedding_dim: usize,
    hidden: Vec<DenseLayer>,
    output: DenseLayer,
}

impl RatingNet {
    pub fn new<R: Rng>(
        rng: &mut R,
        num_users: usize,
        num_products: usize,
        embedding_dim: usize,
    ) -> Self {
        let user_factors = initializer::uniform(rng, num_users, embedding_dim, -0.05, 0.05);
        let product_factors = initializer::uniform(rng, num_products, embedding_dim, -0.05, 0.05);

        let mut hidden = Vec::with_capacity(HIDDEN_SIZES.len());
        let mut fan_in = 2 * embedding_dim;
        for &size in HIDDEN_SIZES.iter() {
            hidden.push(DenseLayer::new(rng, fan_in, size));
            fan_in = size;
        }
        let output = DenseLayer::new(rng, fan_in, 1);

        Self {
            user_factors,
            product_factors,
            embedding_dim,
            hidden,
            output,
        }
    }

    pub fn num_users(&self) -> usize {
        self.user_factors.nrows()
    }

    pub fn num_products(&self) -> usize {
        self.product_factors.nrows()
    }

    fn gather_inputs(&self, users: &[usize], products: &[usize]) -> Array2<f32> {
        let dim = self.embedding_dim;
        let mut input = Array2::zeros((users.len(), 2 * dim));
        for (row, (&u, &p)) in users.iter().zip(products.iter()).enumerate() {
            input
                .slice_mut(s![row, ..dim])
                .assign(&self.user_factors.row(u));
            input
                .slice_mut(s![row, dim..])
                .assign(&self.product_factors.row(p));
        }
        input
    }

    fn forward(&self, users: &[usize], products: &[usize]) -> ForwardPass {
        let input = self.gather_inputs(users, products);

        let mut zs = Vec::with_capacity(self.hidden.len());
        let mut hs = Vec::with_capacity(self.hidden.len());
        for (i, layer) in self.hidden.iter().enumerate() {
            let layer_input = if i == 0 { &input } else { &hs[i - 1] };
            let z = layer.forward(layer_input);
            let h = z.mapv(|v| v.max(0.0));
            zs.push(z);
            hs.push(h);
        }

        let last_activation = hs.last().unwrap_or(&input);
        let predictions = self.output.forward(last_activation);

        ForwardPass {
            input,
            zs,
            hs,
            predictions,
        }
    }

    pub fn predict_batch(&self, users: &[usize], products: &[usize]) -> Vec<f32> {
        if users.is_empty() {
            return Vec::new();
        }
        let pass = self.forward(users, products);
        pass.predictions.index_axis(Axis(1), 0).to_vec()
    }

    /// Mean squared error of the current parameters on the given examples.
    pub fn mse_loss(&self, users: &[usize], products: &[usize], targets: &[f32]) -> f32 {
        if users.is_empty() {
            return 0.0;
        }

        let predictions = self.predict_batch(users, products);
        let sum: f32 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t) * (p - t))
            .sum();

        sum / users.len() as f32
    }

    /// Runs one forward/backward pass over the batch and applies the
    /// optimizer to every parameter tensor. Returns the pre-update loss.
    pub fn train_batch(
        &mut self,
        users: &[usize],
        products: &[usize],
        targets: &[f32],
        optimizer: &mut dyn Optimizer,
    ) -> f32 {
        let batch = users.len();
        if batch == 0 {
            return 0.0;
        }

        let pass = self.forward(users, products);

        // loss and its gradient with respect to the predictions
        let mut loss = 0.0;
        let mut delta = pass.predictions.clone();
        for (row, &target) in targets.iter().enumerate() {
            let diff = pass.predictions[[row, 0]] - target;
            loss += diff * diff;
            delta[[row, 0]] = 2.0 * diff / batch as f32;
        }
        loss /= batch as f32;

        // output layer, dh computed before the weights move
        let last_activation = pass.hs.last().unwrap_or(&pass.input);
        let dw_out = delta.t().dot(last_activation);
        let db_out = delta.sum_axis(Axis(0));
        let mut dh = delta.dot(&self.output.weights);
        optimizer.step(
            "output.weights",
            self.output.weights.view_mut().into_dyn(),
            dw_out.view().into_dyn(),
        );
        optimizer.step(
            "output.bias",
            self.output.bias.view_mut().into_dyn(),
            db_out.view().into_dyn(),
        );

        // hidden layers back to front
        for i in (0..self.hidden.len()).rev() {
            let mut dz = dh;
            dz.zip_mut_with(&pass.zs[i], |g, &z| {
                if z <= 0.0 {
                    *g = 0.0;
                }
            });

            let layer_input = if i == 0 { &pass.input } else { &pass.hs[i - 1] };
            let dw = dz.t().dot(layer_input);
            let db = dz.sum_axis(Axis(0));
            dh = dz.dot(&self.hidden[i].weights);

            optimizer.step(
                &format!("hidden{i}.weights"),
                self.hidden[i].weights.view_mut().into_dyn(),
                dw.view().into_dyn(),
            );
            optimizer.step(
                &format!("hidden{i}.bias"),
                self.hidden[i].bias.view_mut().into_dyn(),
                db.view().into_dyn(),
            );
        }

        // scatter the input gradient into the embedding tables
        let dim = self.embedding_dim;
        let mut du = Array2::zeros(self.user_factors.raw_dim());
        let mut dp = Array2::zeros(self.product_factors.raw_dim());
        for (row, (&u, &p)) in users.iter().zip(products.iter()).enumerate() {
            let dx = dh.row(row);
            let mut user_row = du.row_mut(u);
            user_row += &dx.slice(s![..dim]);
            let mut product_row = dp.row_mut(p);
            product_row += &dx.slice(s![dim..]);
        }
        optimizer.step(
            "user_factors",
            self.user_factors.view_mut().into_dyn(),
            du.view().into_dyn(),
        );
        optimizer.step(
            "product_factors",
            self.product_factors.view_mut().into_dyn(),
            dp.view().into_dyn(),
        );

        loss
    }
}
