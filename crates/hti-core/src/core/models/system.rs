use nalgebra::{Matrix3, Point3, Vector3};

/// An atomic configuration as read from a LAMMPS data file.
///
/// Atom types are stored 0-based even though LAMMPS numbers them from 1. The
/// cell rows are the three lattice vectors `a`, `b`, `c` in Angstroms, built from
/// the `xlo xhi`/`ylo yhi`/`zlo zhi` bounds and the optional `xy xz yz` tilts.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemData {
    /// Number of atoms of each type, indexed by 0-based type.
    atom_numbs: Vec<usize>,
    /// 0-based type of each atom, in file order.
    atom_types: Vec<usize>,
    /// Lower corner of the simulation box.
    origin: Vector3<f64>,
    /// Lattice vectors stored row-wise.
    cell: Matrix3<f64>,
    /// Cartesian coordinates in file order.
    positions: Vec<Point3<f64>>,
    /// Per-type masses from the `Masses` section, when present.
    masses: Option<Vec<f64>>,
}

impl SystemData {
    pub fn new(
        num_types: usize,
        atom_types: Vec<usize>,
        origin: Vector3<f64>,
        cell: Matrix3<f64>,
        positions: Vec<Point3<f64>>,
    ) -> Self {
        let mut atom_numbs = vec![0; num_types];
        for &t in &atom_types {
            if t >= atom_numbs.len() {
                atom_numbs.resize(t + 1, 0);
            }
            atom_numbs[t] += 1;
        }
        Self {
            atom_numbs,
            atom_types,
            origin,
            cell,
            positions,
            masses: None,
        }
    }

    pub fn with_masses(mut self, masses: Vec<f64>) -> Self {
        self.masses = Some(masses);
        self
    }

    pub fn atom_numbs(&self) -> &[usize] {
        &self.atom_numbs
    }

    pub fn atom_types(&self) -> &[usize] {
        &self.atom_types
    }

    pub fn num_types(&self) -> usize {
        self.atom_numbs.len()
    }

    pub fn natoms(&self) -> usize {
        self.atom_types.len()
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub fn cell(&self) -> &Matrix3<f64> {
        &self.cell
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn masses(&self) -> Option<&[f64]> {
        self.masses.as_deref()
    }

    /// Volume of the simulation cell in Å³.
    pub fn volume(&self) -> f64 {
        self.cell.determinant().abs()
    }

    /// Returns `(xy, xz, yz)` when the cell is triclinic.
    pub fn tilts(&self) -> Option<(f64, f64, f64)> {
        let (xy, xz, yz) = (self.cell[(1, 0)], self.cell[(2, 0)], self.cell[(2, 1)]);
        if xy == 0.0 && xz == 0.0 && yz == 0.0 {
            None
        } else {
            Some((xy, xz, yz))
        }
    }
}

/// Scales a per-configuration count by periodic replication factors.
pub fn replicated_count(count: usize, copies: &[usize]) -> usize {
    copies.iter().fold(count, |acc, &c| acc * c)
}

/// Number of rigid triatomic molecules represented by `natoms` atoms.
pub fn molecule_count(natoms: usize) -> usize {
    natoms / crate::core::constants::ATOMS_PER_MOLECULE
}
