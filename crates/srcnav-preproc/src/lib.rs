//! Conditional compilation support.
//!
//! Loads the build-time defines of a project, works out which lines of a
//! source file sit inside `#if`/`#ifdef`/`#ifndef` regions that are disabled
//! under those defines, and turns that into line decorations and fold ranges
//! for the editor.
//!
//! ```
//! use srcnav_preproc::{Defines, plan_for_text};
//!
//! let defines = Defines::parse("[CFLAGS_sort]\n-DFOO\n");
//! let plan = plan_for_text("#ifdef FOO\nA\n#else\nB\n#endif\n", &defines, true);
//! assert_eq!(plan.decorated_lines(), vec![3]);
//! ```

mod conditional;
mod decoration;
mod defines;

pub use conditional::{ConditionalBlock, InactiveLines, analyze, conditional_blocks};
pub use decoration::{DecorationPlan, DecorationTarget, FoldRange, LineDecoration};
pub use defines::{DEFINES_SECTION, Defines, DefinesError};

/// Run the analyzer and the planner over one file.
///
/// Every call recomputes from scratch; nothing is carried over between calls.
pub fn plan_for_text(text: &str, defines: &Defines, fold: bool) -> DecorationPlan {
    let inactive = analyze(text, defines);
    DecorationPlan::from_inactive(&inactive, fold)
}
