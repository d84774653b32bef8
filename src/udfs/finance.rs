//! Discounted cash flow functions.
//!
//! Cash flow `t` (0-based) is discounted by `(1 + rate)^t`, so the first flow
//! is taken at face value.

use crate::executor::contract::{Contract, FieldError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound on simulated paths per scenario request.
pub const MAX_SIMULATIONS: u32 = 1_000_000;

const SCENARIO_SEED: u64 = 42;

fn check_cashflows(cashflows: &[f64], rate: f64) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if cashflows.is_empty() {
        errors.push(FieldError::new("cashflows", "must contain at least one value"));
    } else if cashflows.iter().any(|cf| !cf.is_finite()) {
        errors.push(FieldError::new("cashflows", "must only contain finite numbers"));
    }
    if !rate.is_finite() || rate <= -1.0 {
        errors.push(FieldError::new("rate", "must be a finite number greater than -1"));
    }
    errors
}

fn discounted(cashflows: &[f64], rate: f64) -> Vec<f64> {
    cashflows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(t as i32))
        .collect()
}

// ============================================================
// NPV
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvRequest {
    pub cashflows: Vec<f64>,
    pub rate: f64,
}

impl Contract for NpvRequest {
    fn check(&self) -> Vec<FieldError> {
        check_cashflows(&self.cashflows, self.rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvResponse {
    pub npv: f64,
    pub per_period: Vec<f64>,
}

pub fn npv(req: NpvRequest) -> anyhow::Result<NpvResponse> {
    let per_period = discounted(&req.cashflows, req.rate);
    Ok(NpvResponse {
        npv: per_period.iter().sum(),
        per_period,
    })
}

// ============================================================
// Macaulay duration
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRequest {
    pub cashflows: Vec<f64>,
    pub rate: f64,
}

impl Contract for DurationRequest {
    fn check(&self) -> Vec<FieldError> {
        check_cashflows(&self.cashflows, self.rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationResponse {
    pub npv: f64,
    /// Macaulay duration, in periods.
    pub duration: f64,
    pub pv_per_period: Vec<f64>,
    /// `pv_per_period[t] / npv`.
    pub weights: Vec<f64>,
}

pub fn duration(req: DurationRequest) -> anyhow::Result<DurationResponse> {
    let pv_per_period = discounted(&req.cashflows, req.rate);
    let npv: f64 = pv_per_period.iter().sum();

    let (duration, weights) = if npv == 0.0 {
        (0.0, vec![0.0; pv_per_period.len()])
    } else {
        let weights: Vec<f64> = pv_per_period.iter().map(|pv| pv / npv).collect();
        let duration: f64 = weights
            .iter()
            .enumerate()
            .map(|(t, w)| t as f64 * w)
            .sum();
        (duration, weights)
    };

    Ok(DurationResponse {
        npv,
        duration,
        pv_per_period,
        weights,
    })
}

// ============================================================
// Monte Carlo scenario
// ============================================================

fn default_n_sims() -> u32 {
    1000
}

fn default_sigma() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub cashflows: Vec<f64>,
    pub rate: f64,
    #[serde(default = "default_n_sims")]
    pub n_sims: u32,
    #[serde(default)]
    pub mu: f64,
    #[serde(default = "default_sigma")]
    pub sigma: f64,
}

impl Contract for ScenarioRequest {
    fn check(&self) -> Vec<FieldError> {
        let mut errors = check_cashflows(&self.cashflows, self.rate);
        if !(2..=MAX_SIMULATIONS).contains(&self.n_sims) {
            errors.push(FieldError::new(
                "n_sims",
                format!("must be between 2 and {}", MAX_SIMULATIONS),
            ));
        }
        if !self.mu.is_finite() {
            errors.push(FieldError::new("mu", "must be a finite number"));
        }
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            errors.push(FieldError::new("sigma", "must be a finite, non-negative number"));
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResponse {
    pub npv_mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub npv_std: f64,
}

/// Each simulation shocks every cash flow by `1 + N(mu, sigma)` and discounts
/// the result. The generator is seeded, so identical requests give identical output.
pub fn scenario(req: ScenarioRequest) -> anyhow::Result<ScenarioResponse> {
    let discounts: Vec<f64> = (0..req.cashflows.len())
        .map(|t| 1.0 / (1.0 + req.rate).powi(t as i32))
        .collect();

    let mut rng = StdRng::seed_from_u64(SCENARIO_SEED);
    let npvs: Vec<f64> = (0..req.n_sims)
        .map(|_| {
            req.cashflows
                .iter()
                .zip(&discounts)
                .map(|(cf, d)| cf * (1.0 + normal(&mut rng, req.mu, req.sigma)) * d)
                .sum::<f64>()
        })
        .collect();

    let n = npvs.len() as f64;
    let npv_mean = npvs.iter().sum::<f64>() / n;
    let variance = npvs.iter().map(|v| (v - npv_mean).powi(2)).sum::<f64>() / (n - 1.0);

    if !npv_mean.is_finite() || !variance.is_finite() {
        anyhow::bail!("simulation diverged: non-finite statistics");
    }

    Ok(ScenarioResponse {
        npv_mean,
        npv_std: variance.sqrt(),
    })
}

/// Box-Muller transform.
fn normal(rng: &mut StdRng, mu: f64, sigma: f64) -> f64 {
    // `random` yields [0, 1); shift to (0, 1] so ln() stays finite.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mu + sigma * z
}
