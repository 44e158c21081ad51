//! Configuration decode harness
//!
//! Every [`DecodeCase`] runs twice: the source configuration is decoded as
//! is, then again after a round-trip through YAML text, which changes how
//! numbers, strings and keys are represented.

use crate::runner::{CaseResult, Runner, TestCase};
use probekit_config::{prepare, Decoder, SourceForm, Value};
use probekit_diff::{diff_with, DiffOption};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Source configuration decoded onto a fresh default, and the expected result
///
/// Factories are used rather than values since decoding mutates its
/// destination and every run must start from a pristine one.
pub struct DecodeCase<T, S = serde_json::Value> {
    pub description: String,
    /// Destination holding the defaults
    pub initial: Box<dyn Fn() -> T>,
    /// Source configuration; without it the YAML run does not happen
    pub configuration: Option<Box<dyn Fn() -> S>>,
    pub expected: T,
    /// Decoding is expected to fail
    pub error: bool,
}

impl<T, S> DecodeCase<T, S> {
    pub fn new(
        description: impl Into<String>,
        initial: impl Fn() -> T + 'static,
        configuration: impl Fn() -> S + 'static,
        expected: T,
    ) -> Self {
        Self {
            description: description.into(),
            initial: Box::new(initial),
            configuration: Some(Box::new(configuration)),
            expected,
            error: false,
        }
    }

    /// Case checking the defaults alone
    pub fn without_configuration(
        description: impl Into<String>,
        initial: impl Fn() -> T + 'static,
        expected: T,
    ) -> Self {
        Self {
            description: description.into(),
            initial: Box::new(initial),
            configuration: None,
            expected,
            error: false,
        }
    }

    pub fn expect_error(mut self) -> Self {
        self.error = true;
        self
    }
}

impl<T, S> DecodeCase<T, S>
where
    T: Serialize + DeserializeOwned,
    S: Serialize,
{
    /// Decode this case's source, in `form`, onto a fresh default
    pub fn check(
        &self,
        case: &TestCase,
        decoder: &Decoder,
        form: SourceForm,
        options: &[DiffOption],
    ) -> CaseResult {
        let source = match &self.configuration {
            Some(configuration) => prepare(&configuration(), form)
                .map_err(|e| case.fatal(format!("{} source error:\n{}", form, e)))?,
            None => Value::Null,
        };

        let mut got = (self.initial)();
        let result = decoder.decode_onto(&mut got, source);
        match &result {
            Err(e) if !self.error => return Err(case.fatal(format!("Decode() error:\n{}", e))),
            Ok(()) if self.error => case.error("Decode() did not error"),
            _ => {}
        }

        if result.is_ok() {
            let delta = diff_with(&got, &self.expected, options);
            if !delta.is_empty() {
                return Err(case.fatal(format!("Decode() (-got, +want):\n{}", delta)));
            }
        }
        Ok(())
    }
}

/// Run each case natively, then from YAML
pub fn check_configuration_decode<T, S>(
    runner: &mut Runner,
    cases: &[DecodeCase<T, S>],
    options: &[DiffOption],
) where
    T: Serialize + DeserializeOwned,
    S: Serialize,
{
    let decoder = Decoder::default();
    for tc in cases {
        for form in [SourceForm::Native, SourceForm::Yaml] {
            let title = match form {
                SourceForm::Native => tc.description.clone(),
                SourceForm::Yaml if tc.configuration.is_none() => continue,
                SourceForm::Yaml => format!("{} (from YAML)", tc.description),
            };
            runner.run_sync(title, |case| tc.check(case, &decoder, form, options));
        }
    }
}
