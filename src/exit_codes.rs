//! Stable exit codes for cbwm-eval commands.
//!
//! A failing planner run propagates its own exit code instead; these
//! constants only cover the runner's side.

/// Command succeeded; for `run`, every configuration exited zero.
pub const OK: i32 = 0;
/// Invalid config/arguments, a runner-side failure, or a child that died
/// without an exit code (signal, timeout).
pub const INVALID: i32 = 1;
