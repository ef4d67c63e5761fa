//! Per-evaluation state: bindings, constants and memoized results.

use std::collections::HashMap;
use std::sync::Arc;

use tensorforge_core::Tensor;

/// What one evaluator can see.
///
/// Constants belong to the model and are shared; argument bindings and the
/// results of auxiliary functions belong to the evaluator.
#[derive(Debug, Clone)]
pub struct Context<'m> {
    constants: &'m HashMap<String, Arc<Tensor>>,
    arguments: HashMap<String, Arc<Tensor>>,
    memo: HashMap<String, Arc<Tensor>>,
}

impl<'m> Context<'m> {
    pub(crate) fn new(constants: &'m HashMap<String, Arc<Tensor>>) -> Self {
        Self {
            constants,
            arguments: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    /// Looks up `constant(name)` among the constants and anything else
    /// among the bound arguments.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        match name
            .strip_prefix("constant(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(constant) => self.constant(constant),
            None => self.argument(name),
        }
    }

    pub fn constant(&self, name: &str) -> Option<&Tensor> {
        self.constants.get(name).map(|t| &**t)
    }

    pub fn argument(&self, name: &str) -> Option<&Tensor> {
        self.arguments.get(name).map(|t| &**t)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// Names of the bound arguments, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.arguments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The memoized result of an auxiliary function, if it was computed.
    pub fn memoized(&self, function: &str) -> Option<&Tensor> {
        self.memo.get(function).map(|t| &**t)
    }

    pub(crate) fn bind(&mut self, name: String, value: Arc<Tensor>) {
        self.arguments.insert(name, value);
        self.memo.clear();
    }

    /// Bindings for reading alongside the memo table for writing.
    pub(crate) fn split(&mut self) -> (&HashMap<String, Arc<Tensor>>, &mut HashMap<String, Arc<Tensor>>) {
        (&self.arguments, &mut self.memo)
    }
}
