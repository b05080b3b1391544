pub mod checker;
pub mod diagnostics;
