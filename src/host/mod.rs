//! Narrow adapters the rewrite passes consume: signature matching, statement templates and
//! import maintenance.

pub mod imports;
pub mod matcher;
pub mod template;
