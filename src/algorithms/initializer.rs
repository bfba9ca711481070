use ndarray::{Array1, Array2};
use rand::Rng;

/// Fills a matrix with draws from U(low, high).
///
/// The caller owns the rng so seeded training runs stay reproducible.
pub fn uniform<R: Rng>(rng: &mut R, rows: usize, cols: usize, low: f32, high: f32) -> Array2<f32> {
    let mut matrix = Array2::zeros((rows, cols));
    matrix.mapv_inplace(|_| rng.gen_range(low..high));
    matrix
}

/// Xavier/Glorot uniform init for a dense layer, laid out (fan_out, fan_in).
pub fn xavier_uniform<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize) -> Array2<f32> {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    uniform(rng, fan_out, fan_in, -limit, limit)
}

pub fn zeros(size: usize) -> Array1<f32> {
    Array1::zeros(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let matrix = uniform(&mut rng, 10, 20, -0.05, 0.05);
        assert_eq!(matrix.dim(), (10, 20));
        assert!(matrix.iter().all(|v| (-0.05..0.05).contains(v)));
    }

    #[test]
    fn test_xavier_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let matrix = xavier_uniform(&mut rng, 100, 50);
        let limit = (6.0f32 / 150.0).sqrt();
        assert_eq!(matrix.dim(), (50, 100));
        assert!(matrix.iter().all(|v| v.abs() <= limit));
    }

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(uniform(&mut a, 4, 4, -1.0, 1.0), uniform(&mut b, 4, 4, -1.0, 1.0));
    }
}
