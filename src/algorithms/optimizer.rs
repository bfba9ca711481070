use std::collections::HashMap;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Zip};
use serde::{Deserialize, Serialize};

/// Gradient descent step applied to one named parameter tensor.
///
/// Stateful optimizers track moments per key, so every tensor in a model must
/// use a stable, unique key across steps.
pub trait Optimizer: Send + Sync {
    fn step(&mut self, key: &str, params: ArrayViewMutD<f32>, gradients: ArrayViewD<f32>);
    fn reset(&mut self);
}

pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate: learning_rate as f32,
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, _key: &str, mut params: ArrayViewMutD<f32>, gradients: ArrayViewD<f32>) {
        let lr = self.learning_rate;
        params.zip_mut_with(&gradients, |p, &g| *p -= lr * g);
    }

    fn reset(&mut self) {
        // SGD doesn't maintain state
    }
}

struct AdamSlot {
    t: i32,
    m: ArrayD<f32>,
    v: ArrayD<f32>,
}

pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    slots: HashMap<String, AdamSlot>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate: learning_rate as f32,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            slots: HashMap::new(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, key: &str, mut params: ArrayViewMutD<f32>, gradients: ArrayViewD<f32>) {
        let lr = self.learning_rate;
        let beta1 = self.beta1;
        let beta2 = self.beta2;
        let epsilon = self.epsilon;

        let slot = self.slots.entry(key.to_string()).or_insert_with(|| AdamSlot {
            t: 0,
            m: ArrayD::zeros(gradients.raw_dim()),
            v: ArrayD::zeros(gradients.raw_dim()),
        });

        // each tensor keeps its own step count for bias correction
        slot.t += 1;

        // Update biased first and second moment estimates
        slot.m
            .zip_mut_with(&gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        slot.v
            .zip_mut_with(&gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let bias1 = 1.0 - beta1.powi(slot.t);
        let bias2 = 1.0 - beta2.powi(slot.t);

        Zip::from(&mut params)
            .and(&slot.m)
            .and(&slot.v)
            .for_each(|p, &m, &v| {
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                *p -= lr * m_hat / (v_hat + epsilon).sqrt();
            });
    }

    fn reset(&mut self) {
        self.slots.clear();
    }
}

pub struct AdaGrad {
    learning_rate: f32,
    epsilon: f32,
    sum_squared_gradients: HashMap<String, ArrayD<f32>>,
}

impl AdaGrad {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate: learning_rate as f32,
            epsilon: 1e-8,
            sum_squared_gradients: HashMap::new(),
        }
    }
}

impl Optimizer for AdaGrad {
    fn step(&mut self, key: &str, mut params: ArrayViewMutD<f32>, gradients: ArrayViewD<f32>) {
        let lr = self.learning_rate;
        let epsilon = self.epsilon;

        let sum_sq = self
            .sum_squared_gradients
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(gradients.raw_dim()));

        // Accumulate squared gradients
        sum_sq.zip_mut_with(&gradients, |s, &g| *s += g * g);

        Zip::from(&mut params)
            .and(&*sum_sq)
            .and(&gradients)
            .for_each(|p, &s, &g| *p -= lr * g / (s + epsilon).sqrt());
    }

    fn reset(&mut self) {
        self.sum_squared_gradients.clear();
    }
}

pub struct RMSprop {
    learning_rate: f32,
    decay_rate: f32,
    epsilon: f32,
    cache: HashMap<String, ArrayD<f32>>,
}

impl RMSprop {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate: learning_rate as f32,
            decay_rate: 0.9,
            epsilon: 1e-8,
            cache: HashMap::new(),
        }
    }
}

impl Optimizer for RMSprop {
    fn step(&mut self, key: &str, mut params: ArrayViewMutD<f32>, gradients: ArrayViewD<f32>) {
        let lr = self.learning_rate;
        let decay = self.decay_rate;
        let epsilon = self.epsilon;

        let cache = self
            .cache
            .entry(key.to_string())
            .or_insert_with(|| ArrayD::zeros(gradients.raw_dim()));

        // Update cache with exponential moving average of squared gradients
        cache.zip_mut_with(&gradients, |c, &g| *c = decay * *c + (1.0 - decay) * g * g);

        Zip::from(&mut params)
            .and(&*cache)
            .and(&gradients)
            .for_each(|p, &c, &g| *p -= lr * g / (c + epsilon).sqrt());
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
    Adagrad,
    Rmsprop,
}

impl OptimizerKind {
    pub fn build(self, learning_rate: f64) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(SGD::new(learning_rate)),
            OptimizerKind::Adam => Box::new(Adam::new(learning_rate)),
            OptimizerKind::Adagrad => Box::new(AdaGrad::new(learning_rate)),
            OptimizerKind::Rmsprop => Box::new(RMSprop::new(learning_rate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn test_sgd_step() {
        let mut optimizer = SGD::new(0.1);
        let mut params = Array1::from_vec(vec![1.0f32, 1.0]);
        let gradients = Array1::from_vec(vec![0.5f32, -0.5]);

        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );

        assert!((params[0] - 0.95).abs() < 1e-6);
        assert!((params[1] - 1.05).abs() < 1e-6);
    }

    #[test]
    fn test_adam_first_step_is_signed_learning_rate() {
        let mut optimizer = Adam::new(0.001);
        let mut params = Array1::from_vec(vec![1.0f32, 1.0]);
        let gradients = Array1::from_vec(vec![10.0f32, -0.01]);

        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );

        // after bias correction the first update is lr * sign(gradient)
        assert!((params[0] - (1.0 - 0.001)).abs() < 1e-5);
        assert!((params[1] - (1.0 + 0.001)).abs() < 1e-5);
    }

    #[test]
    fn test_adam_keys_keep_separate_state() {
        let mut optimizer = Adam::new(0.001);
        let mut a = Array1::from_vec(vec![0.0f32]);
        let mut b = Array1::from_vec(vec![0.0f32]);
        let gradients = Array1::from_vec(vec![1.0f32]);

        for _ in 0..5 {
            optimizer.step("a", a.view_mut().into_dyn(), gradients.view().into_dyn());
        }
        optimizer.step("b", b.view_mut().into_dyn(), gradients.view().into_dyn());

        // b has only taken its own first step
        assert!((b[0] + 0.001).abs() < 1e-5);
        assert!(a[0] < b[0]);
    }

    #[test]
    fn test_adam_reset_clears_moments() {
        let mut optimizer = Adam::new(0.001);
        let mut params = Array1::from_vec(vec![0.0f32]);
        let gradients = Array1::from_vec(vec![1.0f32]);

        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );
        let first = params[0];

        optimizer.reset();
        params[0] = 0.0;
        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );

        assert!((params[0] - first).abs() < 1e-7);
    }

    #[test]
    fn test_adagrad_second_step_is_smaller() {
        let mut optimizer = AdaGrad::new(0.1);
        let mut params = Array1::from_vec(vec![0.0f32]);
        let gradients = Array1::from_vec(vec![1.0f32]);

        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );
        let first = -params[0];
        let before = params[0];
        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );
        let second = before - params[0];

        // the accumulated square shrinks the effective learning rate
        assert!((first - 0.1).abs() < 1e-5);
        assert!(second > 0.0 && second < first);
    }

    #[test]
    fn test_rmsprop_first_step_magnitude() {
        let mut optimizer = RMSprop::new(0.001);
        let mut params = Array1::from_vec(vec![1.0f32, 1.0]);
        let gradients = Array1::from_vec(vec![4.0f32, -4.0]);

        optimizer.step(
            "w",
            params.view_mut().into_dyn(),
            gradients.view().into_dyn(),
        );

        // cache starts at (1 - decay) * g^2, so the first step is lr / sqrt(1 - decay)
        let expected = 0.001 / 0.1f32.sqrt();
        assert!((1.0 - params[0] - expected).abs() < 1e-4);
        assert!((params[1] - 1.0 - expected).abs() < 1e-4);
    }

    #[test]
    fn test_optimizer_kind_builds() {
        for kind in [
            OptimizerKind::Sgd,
            OptimizerKind::Adam,
            OptimizerKind::Adagrad,
            OptimizerKind::Rmsprop,
        ] {
            let mut optimizer = kind.build(0.1);
            let mut params = Array1::from_vec(vec![1.0f32]);
            let gradients = Array1::from_vec(vec![1.0f32]);
            optimizer.step(
                "w",
                params.view_mut().into_dyn(),
                gradients.view().into_dyn(),
            );
            assert!(params[0] < 1.0, "{kind:?} should move the parameter");
        }
    }
}
