//! Random-number and special-function facade: the one place sampling and
//! the analytic Poisson/Gamma/lnGamma primitives live, so the rest of the
//! engine never touches `rand`/`statrs` directly.
//!
//! `train.c`'s `init_gsl_rand_gen` only allocated its generator when the
//! pointer was already non-null, so it never actually initialized on
//! first use. `RngFacade::new` always allocates eagerly instead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Discrete, DiscreteCDF, Gamma, Poisson};

pub struct RngFacade {
    rng: StdRng,
}

impl RngFacade {
    /// Pass `Some(seed)` for reproducible runs, `None` to seed from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        RngFacade { rng }
    }

    pub fn uniform01(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn uniform_index(&mut self, k: usize) -> usize {
        assert!(k > 0, "uniform_index requires a nonzero upper bound");
        self.rng.gen_range(0..k)
    }

    /// `k` distinct indices drawn without replacement from `[0, n)`, in a
    /// uniformly random order.
    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Vec<usize> {
        rand::seq::index::sample(&mut self.rng, n, k).into_vec()
    }

    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.rng);
    }

    pub fn poisson_sample(&mut self, mu: f64) -> u64 {
        let dist = Poisson::new(mu).expect("poisson_sample requires mu > 0");
        self.rng.sample(dist) as u64
    }

    pub fn poisson_pmf(k: u64, mu: f64) -> f64 {
        Poisson::new(mu).expect("poisson_pmf requires mu > 0").pmf(k)
    }

    pub fn poisson_cdf(k: u64, mu: f64) -> f64 {
        Poisson::new(mu).expect("poisson_cdf requires mu > 0").cdf(k)
    }

    /// Gamma(shape, rate) density at `x`, exposed for parity with
    /// `train.c`'s `gsl_ran_gamma_pdf`; unused by the core posterior path.
    pub fn gamma_pdf(x: f64, shape: f64, rate: f64) -> f64 {
        use statrs::distribution::Continuous;
        Gamma::new(shape, rate)
            .expect("gamma_pdf requires shape, rate > 0")
            .pdf(x)
    }

    pub fn ln_gamma(x: f64) -> f64 {
        statrs::function::gamma::ln_gamma(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_facades_agree() {
        let mut a = RngFacade::new(Some(42));
        let mut b = RngFacade::new(Some(42));
        for _ in 0..10 {
            assert_eq!(a.uniform_index(100), b.uniform_index(100));
        }
    }

    #[test]
    fn sample_without_replacement_is_distinct_and_in_range() {
        let mut rng = RngFacade::new(Some(7));
        let picked = rng.sample_without_replacement(20, 5);
        assert_eq!(picked.len(), 5);
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
        assert!(picked.iter().all(|&i| i < 20));
    }

    #[test]
    fn poisson_pmf_matches_known_value() {
        // P(X=0) for Poisson(1) = e^-1
        let p = RngFacade::poisson_pmf(0, 1.0);
        approx::assert_relative_eq!(p, std::f64::consts::E.recip(), epsilon = 1e-12);
    }

    #[test]
    fn ln_gamma_matches_factorial() {
        // ln Gamma(5) = ln(4!) = ln 24
        let lg = RngFacade::ln_gamma(5.0);
        approx::assert_relative_eq!(lg, 24f64.ln(), epsilon = 1e-9);
    }
}
