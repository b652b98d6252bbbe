//! Exact SI values (CODATA 2018) and the unit conversions between them and the
//! LAMMPS `metal` unit system (eV, Å, ps, bar, g/mol).

pub const BOLTZMANN: f64 = 1.380_649e-23;
pub const PLANCK: f64 = 6.626_070_15e-34;
pub const AVOGADRO: f64 = 6.022_140_76e23;
pub const ELECTRON_VOLT: f64 = 1.602_176_634e-19;
pub const ANGSTROM: f64 = 1.0e-10;
pub const BAR: f64 = 1.0e5;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = BOLTZMANN / ELECTRON_VOLT;

/// Converts a pressure-volume product in bar·Å³ to eV.
pub const BAR_ANGSTROM3_TO_EV: f64 = BAR * ANGSTROM * ANGSTROM * ANGSTROM / ELECTRON_VOLT;

/// Atoms per rigid water molecule.
pub const ATOMS_PER_MOLECULE: usize = 3;

/// Thermal energy `k_B T` in eV.
#[inline]
pub fn thermal_energy_ev(temperature: f64) -> f64 {
    BOLTZMANN_EV * temperature
}

/// Pauling residual-entropy correction for proton-disordered ice, in eV per molecule.
pub fn pauling_correction(temperature: f64) -> f64 {
    -thermal_energy_ev(temperature) * 1.5_f64.ln()
}
