use crate::engine::config::SwitchProtocol;
use std::fmt;

/// One segment of the path from the Einstein crystal to the target Hamiltonian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// `U = (1-λ) U_spring + λ U_deep`
    Switch,
    /// `U = U_spring + λ U_lj`
    LjOn,
    /// `U = U_spring + (1-λ) U_lj + λ U_deep`, or `U_spring + λ U_deep` without a preceding `lj_on`
    DeepOn,
    /// `U = (1-λ) U_spring + U_deep`
    SpringOff,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Switch => "switch",
            StageKind::LjOn => "lj_on",
            StageKind::DeepOn => "deep_on",
            StageKind::SpringOff => "spring_off",
        }
    }

    /// Parameter key holding the λ grid of this stage.
    pub fn lambda_key(&self) -> &'static str {
        match self {
            StageKind::LjOn => "lambda_lj_on",
            StageKind::DeepOn | StageKind::Switch => "lambda_deep_on",
            StageKind::SpringOff => "lambda_spring_off",
        }
    }

    /// Whether the springs are scaled down by `1-λ` in this stage.
    pub fn scales_springs(&self) -> bool {
        matches!(self, StageKind::Switch | StageKind::SpringOff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stage {
    pub index: usize,
    pub kind: StageKind,
    /// The soft LJ potential is present at λ=0 of a `deep_on` stage.
    pub with_lj: bool,
}

impl Stage {
    pub fn dir_name(&self) -> String {
        format!("{:02}.{}", self.index, self.kind.name())
    }

    /// LAMMPS equal-style expression for `dU/dλ` in terms of the energy variables
    /// `E_spring`, `E_lj` and `E_deep` defined in every task input.
    pub fn dudl_expression(&self) -> &'static str {
        match (self.kind, self.with_lj) {
            (StageKind::Switch, _) => "v_E_deep-v_E_spring",
            (StageKind::LjOn, _) => "v_E_lj",
            (StageKind::DeepOn, true) => "v_E_deep-v_E_lj",
            (StageKind::DeepOn, false) => "v_E_deep",
            (StageKind::SpringOff, _) => "-v_E_spring",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}

pub fn task_dir_name(index: usize) -> String {
    format!("task.{:06}", index)
}

impl SwitchProtocol {
    pub fn stages(&self) -> Vec<Stage> {
        let kinds: &[StageKind] = match self {
            SwitchProtocol::OneStep => &[StageKind::Switch],
            SwitchProtocol::TwoStep => &[StageKind::DeepOn, StageKind::SpringOff],
            SwitchProtocol::ThreeStep | SwitchProtocol::Both => {
                &[StageKind::LjOn, StageKind::DeepOn, StageKind::SpringOff]
            }
        };
        let with_lj = kinds.contains(&StageKind::LjOn);
        kinds
            .iter()
            .enumerate()
            .map(|(index, &kind)| Stage {
                index,
                kind,
                with_lj: with_lj && kind != StageKind::SpringOff,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(protocol: SwitchProtocol) -> Vec<String> {
        protocol.stages().iter().map(Stage::dir_name).collect()
    }

    #[test]
    fn protocols_expand_to_numbered_stages() {
        assert_eq!(dirs(SwitchProtocol::OneStep), vec!["00.switch"]);
        assert_eq!(dirs(SwitchProtocol::TwoStep), vec!["00.deep_on", "01.spring_off"]);
        assert_eq!(
            dirs(SwitchProtocol::Both),
            vec!["00.lj_on", "01.deep_on", "02.spring_off"]
        );
        assert_eq!(SwitchProtocol::ThreeStep.stages(), SwitchProtocol::Both.stages());
    }

    #[test]
    fn deep_on_integrand_depends_on_preceding_lj_stage() {
        let two = SwitchProtocol::TwoStep.stages();
        let three = SwitchProtocol::ThreeStep.stages();
        assert_eq!(two[0].dudl_expression(), "v_E_deep");
        assert_eq!(three[1].dudl_expression(), "v_E_deep-v_E_lj");
        assert_eq!(three[2].dudl_expression(), "-v_E_spring");
    }

    #[test]
    fn task_dirs_are_zero_padded() {
        assert_eq!(task_dir_name(7), "task.000007");
    }
}
