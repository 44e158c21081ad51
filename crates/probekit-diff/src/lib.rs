//! Structural diffs for test assertions
//!
//! Any two `Serialize` values can be compared. Both are serialized into a
//! [`Node`] tree and compared field by field (declaration order), element by
//! element and key by key. The result is empty when nothing differs,
//! otherwise a readable rendering with `-` lines for the first operand and
//! `+` lines for the second.
//!
//! By default zero-valued struct fields are skipped, so an absent field and
//! a zero field compare equal, and fields whose name starts with an
//! underscore are treated as unexported and hidden. Types whose serialized
//! form is an implementation detail can be rendered through a formatter and
//! compared as text.
//!
//! # Example
//!
//! ```ignore
//! use probekit_diff::{diff, diff_with, DiffOption};
//!
//! let delta = diff(&got, &want);
//! assert!(delta.is_empty(), "(-got, +want):\n{}", delta);
//!
//! let delta = diff_with(&got, &want, &[DiffOption::Zero]);
//! ```

mod compare;
mod error;
mod formatters;
mod node;
mod options;
mod ser;

pub use error::DiffError;
pub use node::Node;
pub use options::{DiffConfig, DiffOption, Formatter};

use serde::Serialize;

/// Diff two values with the default options
pub fn diff<A, B>(got: &A, want: &B) -> String
where
    A: Serialize + ?Sized,
    B: Serialize + ?Sized,
{
    DiffConfig::default().diff(got, want)
}

/// Diff two values, folding `options` in order over the defaults
pub fn diff_with<A, B>(got: &A, want: &B, options: &[DiffOption]) -> String
where
    A: Serialize + ?Sized,
    B: Serialize + ?Sized,
{
    DiffConfig::from_options(options).diff(got, want)
}

impl DiffConfig {
    /// Diff two values with this configuration
    pub fn diff<A, B>(&self, got: &A, want: &B) -> String
    where
        A: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        match (ser::to_node(got, self), ser::to_node(want, self)) {
            (Ok(got), Ok(want)) => compare::diff_nodes(&got, &want),
            (got, want) => {
                let mut lines = Vec::new();
                if let Err(e) = got {
                    lines.push(format!("-!(cannot compare: {})", e));
                }
                if let Err(e) = want {
                    lines.push(format!("+!(cannot compare: {})", e));
                }
                lines.join("\n")
            }
        }
    }
}
