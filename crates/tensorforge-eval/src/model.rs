//! Models: named functions over shared constants.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tensorforge_config::OptimizationConfig;
use tensorforge_core::{Tensor, TensorType};
use tensorforge_expr::{Declaration, TypeResolver};
use tracing::info;

use crate::error::ModelError;
use crate::evaluator::FunctionEvaluator;
use crate::function::{Function, FunctionDef};

/// An immutable set of resolved functions and the constants they read.
///
/// ```
/// use tensorforge_core::{Tensor, TensorType};
/// use tensorforge_eval::{FunctionDef, Model};
///
/// let weights = Tensor::from_literal("tensor(d0[3]):[1.0,2.0,3.0]").unwrap();
/// let model = Model::builder("dot")
///     .with_constant("w", weights)
///     .with_function(
///         FunctionDef::parse("score", "reduce(x * constant(w), sum)")
///             .unwrap()
///             .with_argument("x", TensorType::from_spec("tensor(d0[3])").unwrap()),
///     )
///     .build()
///     .unwrap();
///
/// let mut evaluator = model.evaluator().unwrap();
/// evaluator
///     .bind("x", Tensor::from_literal("tensor(d0[3]):[1.0,1.0,1.0]").unwrap())
///     .unwrap();
/// assert_eq!(evaluator.evaluate().unwrap().as_double().unwrap(), 6.0);
/// ```
#[derive(Debug)]
pub struct Model {
    name: String,
    functions: Vec<Arc<Function>>,
    index: HashMap<String, usize>,
    constants: HashMap<String, Arc<Tensor>>,
    optimization: OptimizationConfig,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Functions in definition order.
    pub fn functions(&self) -> &[Arc<Function>] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.index.get(name).map(|&i| &self.functions[i])
    }

    pub fn constant(&self, name: &str) -> Option<&Arc<Tensor>> {
        self.constants.get(name)
    }

    pub fn constants(&self) -> &HashMap<String, Arc<Tensor>> {
        &self.constants
    }

    pub fn optimization(&self) -> &OptimizationConfig {
        &self.optimization
    }

    /// Evaluator of the only function of this model.
    pub fn evaluator(&self) -> Result<FunctionEvaluator<'_>, ModelError> {
        match self.functions.as_slice() {
            [function] => Ok(FunctionEvaluator::new(self, function)),
            _ => Err(ModelError::AmbiguousFunction {
                model: self.name.clone(),
                functions: self.functions.iter().map(|f| f.name().to_string()).collect(),
            }),
        }
    }

    /// Evaluator of the function `name`.
    ///
    /// An exact name wins; otherwise `name` may be the part before the `.`
    /// of exactly one function name, so `serving_default` finds
    /// `serving_default.y`.
    pub fn evaluator_of(&self, name: &str) -> Result<FunctionEvaluator<'_>, ModelError> {
        Ok(FunctionEvaluator::new(self, self.lookup(name)?))
    }

    fn lookup(&self, name: &str) -> Result<&Arc<Function>, ModelError> {
        if let Some(function) = self.function(name) {
            return Ok(function);
        }
        let prefix = format!("{}.", name);
        let candidates: Vec<&Arc<Function>> = self
            .functions
            .iter()
            .filter(|f| f.name().starts_with(&prefix))
            .collect();
        match candidates.as_slice() {
            [function] => Ok(*function),
            [] => Err(ModelError::UnknownFunction {
                model: self.name.clone(),
                function: name.to_string(),
            }),
            _ => Err(ModelError::AmbiguousFunction {
                model: self.name.clone(),
                functions: candidates.iter().map(|f| f.name().to_string()).collect(),
            }),
        }
    }
}

/// Collects constants and function definitions, then links and resolves
/// them into a [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    constants: HashMap<String, Arc<Tensor>>,
    functions: Vec<FunctionDef>,
    optimization: OptimizationConfig,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constants: HashMap::new(),
            functions: Vec::new(),
            optimization: OptimizationConfig::default(),
        }
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Arc<Tensor>>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_optimization(mut self, optimization: OptimizationConfig) -> Self {
        self.optimization = optimization;
        self
    }

    /// Links function references, resolves every type and checks argument
    /// defaults.
    ///
    /// A bare name that is both a declared argument and a function of the
    /// model denotes the argument.
    pub fn build(self) -> Result<Model, ModelError> {
        let ModelBuilder {
            name,
            constants,
            mut functions,
            optimization,
        } = self;

        let mut names = HashSet::with_capacity(functions.len());
        for def in &functions {
            if !names.insert(def.name.clone()) {
                return Err(ModelError::DuplicateFunction {
                    model: name,
                    function: def.name.clone(),
                });
            }
            let mut declared = HashSet::with_capacity(def.arguments.len());
            for argument in &def.arguments {
                if !declared.insert(argument.name()) {
                    return Err(ModelError::DuplicateArgument {
                        function: def.name.clone(),
                        argument: argument.name().to_string(),
                    });
                }
            }
        }

        for def in &mut functions {
            let FunctionDef {
                expression,
                arguments,
                ..
            } = def;
            expression.link_functions(&|candidate: &str| {
                names.contains(candidate) && !arguments.iter().any(|a| a.name() == candidate)
            });
        }

        let types = resolve(&functions, &constants)?;

        for def in &functions {
            for argument in &def.arguments {
                if let Some(default) = argument.default() {
                    if !default.is_assignable_to(argument.tensor_type()) {
                        return Err(ModelError::InvalidDefault {
                            function: def.name.clone(),
                            argument: argument.name().to_string(),
                            declared: argument.tensor_type().clone(),
                            actual: default.tensor_type().clone(),
                        });
                    }
                }
            }
        }

        let mut index = HashMap::with_capacity(functions.len());
        let mut resolved = Vec::with_capacity(functions.len());
        for def in functions {
            let return_type = types
                .get(&def.name)
                .cloned()
                .unwrap_or_else(TensorType::scalar);
            index.insert(def.name.clone(), resolved.len());
            resolved.push(Arc::new(Function::new(def, return_type)));
        }

        let model = Model {
            name,
            functions: resolved,
            index,
            constants,
            optimization,
        };
        if model.optimization.precompile {
            for function in &model.functions {
                function.optimized(&model.optimization);
            }
        }

        info!(
            event = "model_loaded",
            model = %model.name,
            functions = model.functions.len(),
            constants = model.constants.len(),
        );
        Ok(model)
    }
}

fn resolve(
    functions: &[FunctionDef],
    constants: &HashMap<String, Arc<Tensor>>,
) -> Result<HashMap<String, TensorType>, ModelError> {
    let mut resolver = TypeResolver::new();
    for (name, value) in constants {
        resolver.constant(name, value.tensor_type());
    }
    for def in functions {
        let declaration = def.arguments.iter().fold(
            Declaration::new(&def.name, &def.expression),
            |declaration, argument| {
                declaration.with_argument(argument.name(), argument.tensor_type())
            },
        );
        resolver.function(declaration);
    }
    Ok(resolver.resolve_all()?)
}
