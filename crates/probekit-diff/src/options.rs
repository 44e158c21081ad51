//! Diff options and the per-call configuration they fold into

use crate::formatters;
use crate::node::Node;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Renders a value of a given type to its canonical text form
pub type Formatter = Arc<dyn Fn(&Node) -> String + Send + Sync>;

/// Changes the behavior of [`diff_with`](crate::diff_with)
#[derive(Clone)]
pub enum DiffOption {
    /// Also compare fields whose name starts with an underscore
    Unexported,
    /// Also compare zero-valued struct fields
    Zero,
    /// Render values of the named type through `format` instead of
    /// descending into them
    Formatter {
        type_name: &'static str,
        format: Formatter,
    },
}

impl DiffOption {
    /// Register a formatter for the type serialized under `type_name`
    pub fn formatter<F>(type_name: &'static str, format: F) -> Self
    where
        F: Fn(&Node) -> String + Send + Sync + 'static,
    {
        DiffOption::Formatter {
            type_name,
            format: Arc::new(format),
        }
    }

    /// Register a formatter for `T`, keyed by its serialized type name
    pub fn formatter_for<T: ?Sized, F>(format: F) -> Self
    where
        F: Fn(&Node) -> String + Send + Sync + 'static,
    {
        Self::formatter(short_type_name(std::any::type_name::<T>()), format)
    }
}

impl fmt::Debug for DiffOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffOption::Unexported => write!(f, "Unexported"),
            DiffOption::Zero => write!(f, "Zero"),
            DiffOption::Formatter { type_name, .. } => write!(f, "Formatter({})", type_name),
        }
    }
}

/// Comparison behavior for a single diff call
///
/// Built fresh for every call, so concurrent diffs with different options
/// never observe each other.
#[derive(Clone)]
pub struct DiffConfig {
    pub(crate) include_unexported: bool,
    pub(crate) include_zero: bool,
    formatters: HashMap<&'static str, Formatter>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            include_unexported: false,
            include_zero: false,
            formatters: formatters::defaults(),
        }
    }
}

impl DiffConfig {
    /// Fold `options`, in order, over the default configuration
    pub fn from_options(options: &[DiffOption]) -> Self {
        options.iter().fold(Self::default(), Self::apply)
    }

    fn apply(mut self, option: &DiffOption) -> Self {
        match option {
            DiffOption::Unexported => self.include_unexported = true,
            DiffOption::Zero => self.include_zero = true,
            DiffOption::Formatter { type_name, format } => {
                self.formatters.insert(*type_name, format.clone());
            }
        }
        self
    }

    pub(crate) fn formatter(&self, type_name: &str) -> Option<&Formatter> {
        self.formatters.get(type_name)
    }

    /// Whether a struct field survives into the comparison
    pub(crate) fn keeps_field(&self, field: &str, node: &Node) -> bool {
        (self.include_unexported || !field.starts_with('_'))
            && (self.include_zero || !node.is_zero())
    }
}

impl fmt::Debug for DiffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formatters: Vec<_> = self.formatters.keys().collect();
        formatters.sort();
        f.debug_struct("DiffConfig")
            .field("include_unexported", &self.include_unexported)
            .field("include_zero", &self.include_zero)
            .field("formatters", &formatters)
            .finish()
    }
}

/// `a::b::Name<c::D>` -> `Name`
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
