//! Line decorations and fold ranges for inactive regions.

use crate::InactiveLines;

/// Whole-line "inactive code" styling for one zero-based line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDecoration {
    pub line: usize,
}

/// Closed range of zero-based lines that can be collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRange {
    pub start: usize,
    pub end: usize,
}

impl FoldRange {
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Editor surface the plan is pushed into.
pub trait DecorationTarget {
    fn set_inactive_lines(&mut self, decorations: &[LineDecoration]);
    fn set_folds(&mut self, folds: &[FoldRange]);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationPlan {
    pub decorations: Vec<LineDecoration>,
    pub folds: Vec<FoldRange>,
}

impl DecorationPlan {
    pub fn from_inactive(inactive: &InactiveLines, fold: bool) -> Self {
        let decorations = inactive
            .inactive_lines()
            .map(|line| LineDecoration { line })
            .collect();
        let folds = if fold {
            contiguous_runs(inactive.as_slice())
        } else {
            Vec::new()
        };
        Self { decorations, folds }
    }

    pub fn decorated_lines(&self) -> Vec<usize> {
        self.decorations.iter().map(|decoration| decoration.line).collect()
    }

    /// Replace whatever the target shows with this plan. Folds are always
    /// pushed, so a plan without folds clears earlier ones.
    pub fn apply_to(&self, target: &mut dyn DecorationTarget) {
        target.set_inactive_lines(&self.decorations);
        target.set_folds(&self.folds);
    }
}

fn contiguous_runs(flags: &[bool]) -> Vec<FoldRange> {
    let mut runs = Vec::new();
    let mut start = None;

    for (line, &inactive) in flags.iter().enumerate() {
        match (inactive, start) {
            (true, None) => start = Some(line),
            (false, Some(run_start)) => {
                runs.push(FoldRange {
                    start: run_start,
                    end: line - 1,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(run_start) = start {
        runs.push(FoldRange {
            start: run_start,
            end: flags.len() - 1,
        });
    }

    runs
}
