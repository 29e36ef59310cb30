//! Three-pool calcium signaling model.
//!
//! State vector: `[Cacyt, CaEr, CaMyto]` (cytosol, endoplasmic reticulum,
//! mitochondria). Calcium bound to cytosolic proteins (`CaPr`) and free
//! protein (`Pr`) are algebraic: total calcium and total protein are conserved.
//!
//! ```text
//! Jpump = Kpump·Cacyt
//! Jch   = Kch·Cacyt²/(K1²+Cacyt²)·(CaEr−Cacyt)
//! Jleak = Kleak·(CaEr−Cacyt)
//! Jin   = Kin·Cacyt⁸/(K2⁸+Cacyt⁸)
//! Jout  = (Kout·Cacyt²/(K3²+Cacyt²) + Km)·CaMyto
//!
//! CaPr  = Catot − Cacyt − (ρER/βER)·CaEr − (ρM/βM)·CaMyto
//! Pr    = Prtot − CaPr
//!
//! dCacyt/dt  = Jch + Jleak − Jpump + Jout − Jin + K−·CaPr − K+·Cacyt·Pr
//! dCaEr/dt   = (βER/ρER)·(Jpump − Jch − Jleak)
//! dCaMyto/dt = (βM/ρM)·(Jin − Jout)
//! ```

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

pub const CACYT: usize = 0;
pub const CA_ER: usize = 1;
pub const CA_MYTO: usize = 2;

pub const STATE_NAMES: [&str; 3] = ["Cacyt", "CaEr", "CaMyto"];

/// Model constants and initial state.
///
/// Every field has a default, so a JSON override file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalciumParams {
    /// Total calcium.
    pub ca_total: f64,
    /// Total binding protein.
    pub pr_total: f64,
    /// ER / cytosol volume ratio.
    pub rho_er: f64,
    /// Mitochondria / cytosol volume ratio.
    pub rho_m: f64,
    /// Fraction of free calcium in the ER.
    pub beta_er: f64,
    /// Fraction of free calcium in mitochondria.
    pub beta_m: f64,
    pub k_ch: f64,
    pub k_pump: f64,
    pub k_leak: f64,
    pub k_in: f64,
    pub k_out: f64,
    pub k_m: f64,
    /// Protein binding rate.
    pub k_plus: f64,
    /// Protein unbinding rate.
    pub k_minus: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub initial: [f64; 3],
}

impl Default for CalciumParams {
    fn default() -> Self {
        Self {
            ca_total: 90.0,
            pr_total: 120.0,
            rho_er: 0.1,
            rho_m: 0.1,
            beta_er: 0.0025,
            beta_m: 0.0025,
            k_ch: 4100.0,
            k_pump: 20.0,
            k_leak: 0.05,
            k_in: 300.0,
            k_out: 125.0,
            k_m: 0.00625,
            k_plus: 0.1,
            k_minus: 0.01,
            k1: 5.0,
            k2: 0.8,
            k3: 5.0,
            initial: [0.3, 0.2, 1.0],
        }
    }
}

/// Instantaneous transport fluxes for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluxes {
    pub pump: f64,
    pub channel: f64,
    pub leak: f64,
    pub uptake: f64,
    pub release: f64,
}

impl CalciumParams {
    /// Load overrides from a JSON file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, FitError> {
        let file = File::open(path)?;
        serde_json::from_reader(file)
            .map_err(|e| FitError::InvalidInput(format!("calcium parameters '{}': {e}", path.display())))
    }

    pub fn validate(&self) -> Result<(), FitError> {
        let all = [
            self.ca_total,
            self.pr_total,
            self.rho_er,
            self.rho_m,
            self.beta_er,
            self.beta_m,
            self.k_ch,
            self.k_pump,
            self.k_leak,
            self.k_in,
            self.k_out,
            self.k_m,
            self.k_plus,
            self.k_minus,
            self.k1,
            self.k2,
            self.k3,
        ];
        if all.iter().chain(self.initial.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::InvalidInput("calcium parameters must be finite".into()));
        }
        if self.rho_er <= 0.0 || self.rho_m <= 0.0 || self.beta_er <= 0.0 || self.beta_m <= 0.0 {
            return Err(FitError::InvalidInput(
                "volume ratios and free fractions must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn fluxes(&self, x: &[f64]) -> Fluxes {
        let (cyt, er, myto) = (component(x, CACYT), component(x, CA_ER), component(x, CA_MYTO));
        let cyt2 = cyt * cyt;
        let cyt8 = cyt2 * cyt2 * cyt2 * cyt2;
        Fluxes {
            pump: self.k_pump * cyt,
            channel: self.k_ch * cyt2 / (self.k1 * self.k1 + cyt2) * (er - cyt),
            leak: self.k_leak * (er - cyt),
            uptake: self.k_in * cyt8 / (self.k2.powi(8) + cyt8),
            release: (self.k_out * cyt2 / (self.k3 * self.k3 + cyt2) + self.k_m) * myto,
        }
    }

    /// Protein-bound calcium, from conservation of total calcium.
    pub fn bound_calcium(&self, x: &[f64]) -> f64 {
        self.ca_total
            - component(x, CACYT)
            - (self.rho_er / self.beta_er) * component(x, CA_ER)
            - (self.rho_m / self.beta_m) * component(x, CA_MYTO)
    }

    /// Free binding protein, from conservation of total protein.
    pub fn free_protein(&self, x: &[f64]) -> f64 {
        self.pr_total - self.bound_calcium(x)
    }

    /// Fill `out` with `d[Cacyt, CaEr, CaMyto]/dt`.
    ///
    /// A state with fewer than three components yields NaN rates, which
    /// `simulate_ode` reports as divergence.
    pub fn rates(&self, x: &[f64], out: &mut [f64]) {
        if x.len() < STATE_NAMES.len() {
            out.fill(f64::NAN);
            return;
        }
        let [d_cyt, d_er, d_myto, ..] = out else {
            return;
        };
        let j = self.fluxes(x);
        let ca_pr = self.bound_calcium(x);
        let pr = self.pr_total - ca_pr;

        *d_cyt = j.channel + j.leak - j.pump + j.release - j.uptake + self.k_minus * ca_pr
            - self.k_plus * x[CACYT] * pr;
        *d_er = (self.beta_er / self.rho_er) * (j.pump - j.channel - j.leak);
        *d_myto = (self.beta_m / self.rho_m) * (j.uptake - j.release);
    }
}

fn component(x: &[f64], i: usize) -> f64 {
    x.get(i).copied().unwrap_or(f64::NAN)
}

/// The model as a `simulate_ode` derivative.
pub fn calcium_derivative(params: &CalciumParams) -> impl Fn(f64, &[f64], &mut [f64]) + '_ {
    move |_t: f64, x: &[f64], out: &mut [f64]| params.rates(x, out)
}
