use crate::core::constants::{ANGSTROM, AVOGADRO, BOLTZMANN, PLANCK, thermal_energy_ev};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum EinsteinError {
    #[error("{what} lists {actual} values but the configuration has {expected} atom types")]
    TypeCountMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("Reference atom type {0} is not present in the configuration")]
    MissingReferenceAtom(usize),
}

/// How the centre-of-mass motion of the reference crystal is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CrystalModel {
    /// Frenkel–Ladd Einstein crystal with the centre of mass held fixed.
    Frenkel,
    /// Vega's Einstein molecule: one reference atom carries no spring.
    #[default]
    Vega,
}

impl fmt::Display for CrystalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrystalModel::Frenkel => f.write_str("frenkel"),
            CrystalModel::Vega => f.write_str("vega"),
        }
    }
}

/// De Broglie thermal wavelength in Å for a particle of `mass` g/mol.
pub fn thermal_wavelength(temperature: f64, mass: f64) -> f64 {
    let mass_kg = mass * 1e-3 / AVOGADRO;
    PLANCK / (2.0 * PI * mass_kg * BOLTZMANN * temperature).sqrt() / ANGSTROM
}

/// Width in Å of the classical harmonic well `(2π kT / k)^{1/2}` for a spring of `spring_k` eV/Å².
pub fn spring_wavelength(temperature: f64, spring_k: f64) -> f64 {
    (2.0 * PI * thermal_energy_ev(temperature) / spring_k).sqrt()
}

/// An Einstein crystal: independent harmonic wells, one per atom, at temperature `T`.
///
/// All per-type slices are indexed by 0-based atom type. `atom_numbs` and `volume`
/// describe the full (replicated) simulation cell.
#[derive(Debug, Clone)]
pub struct EinsteinCrystal<'a> {
    pub temperature: f64,
    pub masses: &'a [f64],
    pub spring_constants: &'a [f64],
    pub atom_numbs: &'a [usize],
    pub volume: f64,
    pub model: CrystalModel,
    /// Type of the atom that carries no spring in the Vega model.
    pub reference_type: usize,
}

impl EinsteinCrystal<'_> {
    fn validate(&self) -> Result<(), EinsteinError> {
        let ntypes = self.atom_numbs.len();
        for (what, actual) in [
            ("mass_map", self.masses.len()),
            ("spring_k", self.spring_constants.len()),
        ] {
            if actual != ntypes {
                return Err(EinsteinError::TypeCountMismatch {
                    what,
                    expected: ntypes,
                    actual,
                });
            }
        }
        let positives = [("temp", self.temperature), ("volume", self.volume)]
            .into_iter()
            .chain(self.masses.iter().map(|&m| ("mass", m)))
            .chain(self.spring_constants.iter().map(|&k| ("spring_k", k)));
        for (field, value) in positives {
            if !(value > 0.0) {
                return Err(EinsteinError::NonPositive { field, value });
            }
        }
        if self.model == CrystalModel::Vega
            && self.atom_numbs.get(self.reference_type).copied().unwrap_or(0) == 0
        {
            return Err(EinsteinError::MissingReferenceAtom(self.reference_type));
        }
        Ok(())
    }

    /// Helmholtz free energy per atom in eV.
    pub fn free_energy_per_atom(&self) -> Result<f64, EinsteinError> {
        self.validate()?;
        let t = self.temperature;
        let natoms: usize = self.atom_numbs.iter().sum();
        let lambda_t: Vec<f64> = self.masses.iter().map(|&m| thermal_wavelength(t, m)).collect();
        let lambda_s: Vec<f64> = self
            .spring_constants
            .iter()
            .map(|&k| spring_wavelength(t, k))
            .collect();

        let mut beta_f: f64 = self
            .atom_numbs
            .iter()
            .enumerate()
            .map(|(i, &n)| 3.0 * n as f64 * (lambda_t[i] / lambda_s[i]).ln())
            .sum();

        match self.model {
            CrystalModel::Frenkel => {
                let mean_k = self
                    .atom_numbs
                    .iter()
                    .zip(self.spring_constants)
                    .map(|(&n, &k)| n as f64 * k)
                    .sum::<f64>()
                    / natoms as f64;
                beta_f += 3.0 * spring_wavelength(t, mean_k).ln()
                    - 1.5 * (natoms as f64).ln()
                    - self.volume.ln();
            }
            CrystalModel::Vega => {
                let r = self.reference_type;
                beta_f -= 3.0 * (lambda_t[r] / lambda_s[r]).ln();
                beta_f += (lambda_t[r].powi(3) / self.volume).ln();
            }
        }

        Ok(beta_f * thermal_energy_ev(t) / natoms as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ice(model: CrystalModel) -> EinsteinCrystal<'static> {
        EinsteinCrystal {
            temperature: 200.0,
            masses: &[15.9994, 1.008],
            spring_constants: &[20.0, 20.0],
            atom_numbs: &[96, 192],
            volume: 2_800.0,
            model,
            reference_type: 0,
        }
    }

    #[test]
    fn thermal_wavelength_of_argon_at_room_temperature() {
        // Λ(Ar, 298.15 K) ≈ 0.16 Å
        let l = thermal_wavelength(298.15, 39.948);
        assert!((l - 0.1598).abs() < 1e-3, "got {l}");
    }

    #[test]
    fn stiffer_springs_raise_the_free_energy() {
        let soft = ice(CrystalModel::Frenkel).free_energy_per_atom().unwrap();
        let mut stiff = ice(CrystalModel::Frenkel);
        stiff.spring_constants = &[40.0, 40.0];
        let stiff = stiff.free_energy_per_atom().unwrap();
        // each atom gains 1.5 kT ln 2, less one atom's worth for the fixed centre of mass
        let expected = 1.5 * thermal_energy_ev(200.0) * 2.0_f64.ln() * 287.0 / 288.0;
        assert!((stiff - soft - expected).abs() < 1e-12);
    }

    #[test]
    fn single_type_crystal_matches_closed_form() {
        let crystal = EinsteinCrystal {
            temperature: 100.0,
            masses: &[20.0],
            spring_constants: &[5.0],
            atom_numbs: &[10],
            volume: 500.0,
            model: CrystalModel::Vega,
            reference_type: 0,
        };
        let lt = thermal_wavelength(100.0, 20.0);
        let ls = spring_wavelength(100.0, 5.0);
        let beta_f = 27.0 * (lt / ls).ln() + (lt.powi(3) / 500.0).ln();
        let expected = beta_f * thermal_energy_ev(100.0) / 10.0;
        assert!((crystal.free_energy_per_atom().unwrap() - expected).abs() < 1e-14);
    }

    #[test]
    fn frenkel_and_vega_differ_only_by_finite_size_terms() {
        let f = ice(CrystalModel::Frenkel).free_energy_per_atom().unwrap();
        let v = ice(CrystalModel::Vega).free_energy_per_atom().unwrap();
        assert!((f - v).abs() < 0.01);
        assert_ne!(f, v);
    }

    #[test]
    fn mismatched_mass_map_is_rejected() {
        let mut crystal = ice(CrystalModel::Vega);
        crystal.masses = &[15.9994];
        assert!(matches!(
            crystal.free_energy_per_atom(),
            Err(EinsteinError::TypeCountMismatch { what: "mass_map", .. })
        ));
    }

    #[test]
    fn non_positive_spring_is_rejected() {
        let mut crystal = ice(CrystalModel::Vega);
        crystal.spring_constants = &[20.0, 0.0];
        assert_eq!(
            crystal.free_energy_per_atom(),
            Err(EinsteinError::NonPositive {
                field: "spring_k",
                value: 0.0
            })
        );
    }

    #[test]
    fn vega_needs_an_atom_of_the_reference_type() {
        let mut crystal = ice(CrystalModel::Vega);
        crystal.atom_numbs = &[0, 192];
        assert_eq!(
            crystal.free_energy_per_atom(),
            Err(EinsteinError::MissingReferenceAtom(0))
        );
    }

    #[test]
    fn crystal_model_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CrystalModel::Frenkel).unwrap(), "\"frenkel\"");
        assert_eq!(CrystalModel::Vega.to_string(), "vega");
    }
}
