use crate::core::io::traits::ConfigurationFile;
use crate::core::models::system::SystemData;
use nalgebra::{Matrix3, Point3, Vector3};
use phf::{Map, phf_map};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LammpsDataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: LammpsParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
}

#[derive(Debug, Error)]
pub enum LammpsParseErrorKind {
    #[error("Invalid integer '{value}' for {field}")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float '{value}' for {field}")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Expected {expected} columns in '{section}' section, found {found}")]
    ColumnCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Unsupported atom style '{0}'")]
    UnsupportedStyle(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Atoms,
    AtomTypes,
    XBounds,
    YBounds,
    ZBounds,
    Tilts,
}

static HEADER_KEYWORDS: Map<&'static str, HeaderField> = phf_map! {
    "atoms" => HeaderField::Atoms,
    "atom types" => HeaderField::AtomTypes,
    "xlo xhi" => HeaderField::XBounds,
    "ylo yhi" => HeaderField::YBounds,
    "zlo zhi" => HeaderField::ZBounds,
    "xy xz yz" => HeaderField::Tilts,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Masses,
    Atoms,
    Ignored,
}

static SECTION_KEYWORDS: Map<&'static str, Section> = phf_map! {
    "Masses" => Section::Masses,
    "Atoms" => Section::Atoms,
    "Velocities" => Section::Ignored,
    "Bonds" => Section::Ignored,
    "Angles" => Section::Ignored,
    "Dihedrals" => Section::Ignored,
    "Impropers" => Section::Ignored,
    "Pair Coeffs" => Section::Ignored,
    "PairIJ Coeffs" => Section::Ignored,
    "Bond Coeffs" => Section::Ignored,
    "Angle Coeffs" => Section::Ignored,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomStyle {
    Atomic,
    Charge,
    Molecular,
    Full,
}

impl AtomStyle {
    fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "atomic" => Some(Self::Atomic),
            "charge" => Some(Self::Charge),
            "molecular" | "bond" | "angle" => Some(Self::Molecular),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    fn from_column_count(n: usize) -> Option<Self> {
        match n {
            5 | 8 => Some(Self::Atomic),
            6 | 9 => Some(Self::Charge),
            7 | 10 => Some(Self::Full),
            _ => None,
        }
    }

    /// Column layout of the `Atoms` section: `(type column, first coordinate column, width)`.
    fn layout(self) -> (usize, usize, usize) {
        match self {
            Self::Atomic => (1, 2, 5),
            Self::Charge => (1, 3, 6),
            Self::Molecular => (2, 3, 6),
            Self::Full => (2, 4, 7),
        }
    }
}

fn strip_comment(line: &str) -> (&str, Option<&str>) {
    match line.split_once('#') {
        Some((body, comment)) => (body.trim(), Some(comment.trim())),
        None => (line.trim(), None),
    }
}

fn parse_float(token: &str, field: &'static str, line: usize) -> Result<f64, LammpsDataError> {
    token.parse().map_err(|_| LammpsDataError::Parse {
        line,
        kind: LammpsParseErrorKind::InvalidFloat {
            field,
            value: token.to_string(),
        },
    })
}

fn parse_int(token: &str, field: &'static str, line: usize) -> Result<usize, LammpsDataError> {
    token.parse().map_err(|_| LammpsDataError::Parse {
        line,
        kind: LammpsParseErrorKind::InvalidInt {
            field,
            value: token.to_string(),
        },
    })
}

#[derive(Default)]
struct Header {
    natoms: Option<usize>,
    ntypes: Option<usize>,
    x: Option<(f64, f64)>,
    y: Option<(f64, f64)>,
    z: Option<(f64, f64)>,
    tilts: (f64, f64, f64),
}

impl Header {
    fn accept(&mut self, body: &str, line: usize) -> Result<bool, LammpsDataError> {
        let tokens: Vec<&str> = body.split_whitespace().collect();
        for numeric in [1, 2, 3] {
            if tokens.len() <= numeric {
                continue;
            }
            let keyword = tokens[numeric..].join(" ");
            let Some(&field) = HEADER_KEYWORDS.get(keyword.as_str()) else {
                continue;
            };
            let values = &tokens[..numeric];
            match (field, values) {
                (HeaderField::Atoms, [n]) => self.natoms = Some(parse_int(n, "atoms", line)?),
                (HeaderField::AtomTypes, [n]) => {
                    self.ntypes = Some(parse_int(n, "atom types", line)?)
                }
                (HeaderField::XBounds, [lo, hi]) => {
                    self.x = Some((parse_float(lo, "xlo", line)?, parse_float(hi, "xhi", line)?))
                }
                (HeaderField::YBounds, [lo, hi]) => {
                    self.y = Some((parse_float(lo, "ylo", line)?, parse_float(hi, "yhi", line)?))
                }
                (HeaderField::ZBounds, [lo, hi]) => {
                    self.z = Some((parse_float(lo, "zlo", line)?, parse_float(hi, "zhi", line)?))
                }
                (HeaderField::Tilts, [xy, xz, yz]) => {
                    self.tilts = (
                        parse_float(xy, "xy", line)?,
                        parse_float(xz, "xz", line)?,
                        parse_float(yz, "yz", line)?,
                    )
                }
                _ => continue,
            }
            return Ok(true);
        }
        Ok(false)
    }
}

pub struct LammpsDataFile;

impl ConfigurationFile for LammpsDataFile {
    type Error = LammpsDataError;

    fn read_from(reader: &mut impl BufRead) -> Result<SystemData, Self::Error> {
        let mut header = Header::default();
        let mut section: Option<Section> = None;
        let mut style: Option<AtomStyle> = None;
        let mut atoms: Vec<(usize, usize, Point3<f64>)> = Vec::new();
        let mut masses: Vec<(usize, f64)> = Vec::new();

        for (idx, line_res) in reader.lines().enumerate() {
            let raw = line_res?;
            let line_num = idx + 1;
            // The first line of a data file is always a free-form title.
            if line_num == 1 {
                continue;
            }
            let (body, comment) = strip_comment(&raw);
            if body.is_empty() {
                continue;
            }

            if let Some(&next) = SECTION_KEYWORDS.get(body) {
                section = Some(next);
                if next == Section::Atoms {
                    style = match comment {
                        Some(hint) if !hint.is_empty() => Some(
                            AtomStyle::from_hint(hint).ok_or_else(|| LammpsDataError::Parse {
                                line: line_num,
                                kind: LammpsParseErrorKind::UnsupportedStyle(hint.to_string()),
                            })?,
                        ),
                        _ => None,
                    };
                }
                continue;
            }

            match section {
                None => {
                    if !header.accept(body, line_num)? {
                        debug!("Skipping unrecognised header line {}: '{}'", line_num, body);
                    }
                }
                Some(Section::Masses) => {
                    let tokens: Vec<&str> = body.split_whitespace().collect();
                    if tokens.len() < 2 {
                        return Err(LammpsDataError::Parse {
                            line: line_num,
                            kind: LammpsParseErrorKind::ColumnCount {
                                section: "Masses",
                                expected: 2,
                                found: tokens.len(),
                            },
                        });
                    }
                    masses.push((
                        parse_int(tokens[0], "mass type", line_num)?,
                        parse_float(tokens[1], "mass", line_num)?,
                    ));
                }
                Some(Section::Atoms) => {
                    let tokens: Vec<&str> = body.split_whitespace().collect();
                    let atom_style = match style {
                        Some(s) => s,
                        None => {
                            let s = AtomStyle::from_column_count(tokens.len()).ok_or_else(|| {
                                LammpsDataError::Parse {
                                    line: line_num,
                                    kind: LammpsParseErrorKind::UnsupportedStyle(format!(
                                        "{} columns",
                                        tokens.len()
                                    )),
                                }
                            })?;
                            style = Some(s);
                            s
                        }
                    };
                    let (type_col, coord_col, width) = atom_style.layout();
                    if tokens.len() < width {
                        return Err(LammpsDataError::Parse {
                            line: line_num,
                            kind: LammpsParseErrorKind::ColumnCount {
                                section: "Atoms",
                                expected: width,
                                found: tokens.len(),
                            },
                        });
                    }
                    let id = parse_int(tokens[0], "atom id", line_num)?;
                    let atom_type = parse_int(tokens[type_col], "atom type", line_num)?;
                    if atom_type == 0 {
                        return Err(LammpsDataError::Inconsistency(format!(
                            "Atom {} has type 0; LAMMPS types start at 1",
                            id
                        )));
                    }
                    let position = Point3::new(
                        parse_float(tokens[coord_col], "x", line_num)?,
                        parse_float(tokens[coord_col + 1], "y", line_num)?,
                        parse_float(tokens[coord_col + 2], "z", line_num)?,
                    );
                    atoms.push((id, atom_type - 1, position));
                }
                Some(Section::Ignored) => {}
            }
        }

        let natoms = header.natoms.ok_or(LammpsDataError::MissingRecord("atoms"))?;
        let ntypes = header
            .ntypes
            .ok_or(LammpsDataError::MissingRecord("atom types"))?;
        let (xlo, xhi) = header.x.ok_or(LammpsDataError::MissingRecord("xlo xhi"))?;
        let (ylo, yhi) = header.y.ok_or(LammpsDataError::MissingRecord("ylo yhi"))?;
        let (zlo, zhi) = header.z.ok_or(LammpsDataError::MissingRecord("zlo zhi"))?;
        if atoms.len() != natoms {
            return Err(LammpsDataError::Inconsistency(format!(
                "Header declares {} atoms but the Atoms section lists {}",
                natoms,
                atoms.len()
            )));
        }
        atoms.sort_by_key(|(id, _, _)| *id);
        if let Some(&(_, bad, _)) = atoms.iter().find(|(_, t, _)| *t >= ntypes) {
            return Err(LammpsDataError::Inconsistency(format!(
                "Atom type {} exceeds the declared {} atom types",
                bad + 1,
                ntypes
            )));
        }

        let (xy, xz, yz) = header.tilts;
        #[rustfmt::skip]
        let cell = Matrix3::new(
            xhi - xlo, 0.0, 0.0,
            xy, yhi - ylo, 0.0,
            xz, yz, zhi - zlo,
        );
        let (atom_types, positions) = atoms.into_iter().map(|(_, t, p)| (t, p)).unzip();
        let mut system = SystemData::new(
            ntypes,
            atom_types,
            Vector3::new(xlo, ylo, zlo),
            cell,
            positions,
        );

        if !masses.is_empty() {
            let mut per_type = vec![0.0; ntypes];
            for (t, m) in masses {
                if t == 0 || t > ntypes {
                    return Err(LammpsDataError::Inconsistency(format!(
                        "Mass given for undeclared atom type {}",
                        t
                    )));
                }
                per_type[t - 1] = m;
            }
            system = system.with_masses(per_type);
        }

        debug!(
            "Parsed LAMMPS data file: {} atoms, {} types, volume {:.3} A^3",
            system.natoms(),
            system.num_types(),
            system.volume()
        );
        Ok(system)
    }

    fn write_to(system: &SystemData, writer: &mut impl Write) -> Result<(), Self::Error> {
        let cell = system.cell();
        let origin = system.origin();
        writeln!(writer, "LAMMPS data file written by hti-ice")?;
        writeln!(writer)?;
        writeln!(writer, "{} atoms", system.natoms())?;
        writeln!(writer, "{} atom types", system.num_types())?;
        writeln!(writer)?;
        writeln!(writer, "{:.10} {:.10} xlo xhi", origin.x, origin.x + cell[(0, 0)])?;
        writeln!(writer, "{:.10} {:.10} ylo yhi", origin.y, origin.y + cell[(1, 1)])?;
        writeln!(writer, "{:.10} {:.10} zlo zhi", origin.z, origin.z + cell[(2, 2)])?;
        if let Some((xy, xz, yz)) = system.tilts() {
            writeln!(writer, "{:.10} {:.10} {:.10} xy xz yz", xy, xz, yz)?;
        }
        if let Some(masses) = system.masses() {
            writeln!(writer)?;
            writeln!(writer, "Masses")?;
            writeln!(writer)?;
            for (i, m) in masses.iter().enumerate() {
                writeln!(writer, "{} {:.6}", i + 1, m)?;
            }
        }
        writeln!(writer)?;
        writeln!(writer, "Atoms # atomic")?;
        writeln!(writer)?;
        for (i, (t, p)) in system
            .atom_types()
            .iter()
            .zip(system.positions())
            .enumerate()
        {
            writeln!(
                writer,
                "{:>8} {:>4} {:>16.10} {:>16.10} {:>16.10}",
                i + 1,
                t + 1,
                p.x,
                p.y,
                p.z
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ATOMIC: &str = "\
# ice Ih fragment

6 atoms
2 atom types

0.0 4.5 xlo xhi
0.0 7.8 ylo yhi
0.0 7.3 zlo zhi
0.0 0.0 0.0 xy xz yz

Masses

1 15.9994
2 1.008

Atoms # atomic

4 2 0.0 0.8 0.6
1 1 0.0 0.0 0.0
2 2 0.9 0.0 0.3
3 2 -0.3 0.9 0.0
5 1 2.2 2.0 1.0
6 2 3.1 2.0 1.2
";

    const FULL_NO_HINT: &str = "\
water

3 atoms
2 atom types
0 10 xlo xhi
0 10 ylo yhi
0 12 zlo zhi
1.0 0.0 0.0 xy xz yz

Atoms

1 1 1 -0.8476 0.0 0.0 0.0
2 1 2 0.4238 0.8 0.6 0.0
3 1 2 0.4238 -0.8 0.6 0.0

Velocities

1 0 0 0
2 0 0 0
3 0 0 0
";

    fn read(content: &str) -> Result<SystemData, LammpsDataError> {
        LammpsDataFile::read_from(&mut Cursor::new(content))
    }

    #[test]
    fn reads_atomic_style_and_sorts_by_id() {
        let sys = read(ATOMIC).unwrap();
        assert_eq!(sys.natoms(), 6);
        assert_eq!(sys.atom_numbs(), &[2, 4]);
        assert_eq!(sys.atom_types(), &[0, 1, 1, 1, 0, 1]);
        assert_eq!(sys.positions()[3], Point3::new(0.0, 0.8, 0.6));
        assert_eq!(sys.masses(), Some(&[15.9994, 1.008][..]));
        assert!((sys.volume() - 4.5 * 7.8 * 7.3).abs() < 1e-9);
        assert_eq!(sys.tilts(), None);
    }

    #[test]
    fn infers_full_style_from_column_count_and_skips_velocities() {
        let sys = read(FULL_NO_HINT).unwrap();
        assert_eq!(sys.atom_numbs(), &[1, 2]);
        assert_eq!(sys.positions()[1], Point3::new(0.8, 0.6, 0.0));
        assert_eq!(sys.tilts(), Some((1.0, 0.0, 0.0)));
        assert!((sys.volume() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn atom_count_mismatch_is_inconsistent() {
        let content = ATOMIC.replace("6 atoms", "7 atoms");
        assert!(matches!(read(&content), Err(LammpsDataError::Inconsistency(_))));
    }

    #[test]
    fn missing_box_bounds_is_reported() {
        let content = ATOMIC.replace("0.0 7.3 zlo zhi\n", "");
        assert!(matches!(
            read(&content),
            Err(LammpsDataError::MissingRecord("zlo zhi"))
        ));
    }

    #[test]
    fn bad_coordinate_reports_line_number() {
        let content = ATOMIC.replace("2.2 2.0 1.0", "2.2 abc 1.0");
        match read(&content) {
            Err(LammpsDataError::Parse { line, kind }) => {
                assert_eq!(line, 22);
                assert!(matches!(kind, LammpsParseErrorKind::InvalidFloat { field: "y", .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_style_hint_is_rejected() {
        let content = ATOMIC.replace("Atoms # atomic", "Atoms # ellipsoid");
        assert!(matches!(
            read(&content),
            Err(LammpsDataError::Parse {
                kind: LammpsParseErrorKind::UnsupportedStyle(_),
                ..
            })
        ));
    }

    #[test]
    fn type_beyond_header_is_inconsistent() {
        let content = ATOMIC.replace("2 atom types", "1 atom types");
        assert!(matches!(read(&content), Err(LammpsDataError::Inconsistency(_))));
    }

    #[test]
    fn written_file_reads_back_identically() {
        let sys = read(FULL_NO_HINT).unwrap();
        let mut buffer = Vec::new();
        LammpsDataFile::write_to(&sys, &mut buffer).unwrap();
        let again = read(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(again.atom_types(), sys.atom_types());
        assert_eq!(again.tilts(), sys.tilts());
        assert!((again.volume() - sys.volume()).abs() < 1e-6);
    }

    #[test]
    fn read_from_path_propagates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LammpsDataFile::read_from_path(dir.path().join("conf.lmp"));
        assert!(matches!(result, Err(LammpsDataError::Io(_))));
    }
}
