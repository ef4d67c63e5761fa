//! Function definitions and resolved functions.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tensorforge_config::OptimizationConfig;
use tensorforge_core::{Tensor, TensorType};
use tensorforge_expr::Expr;
use tracing::info;

use crate::error::ModelError;
use crate::gbdt::OptimizedForest;

/// A declared argument: name, type and an optional default value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDef {
    name: String,
    tensor_type: TensorType,
    default: Option<Arc<Tensor>>,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>, tensor_type: TensorType) -> Self {
        Self {
            name: name.into(),
            tensor_type,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Arc<Tensor>>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tensor_type(&self) -> &TensorType {
        &self.tensor_type
    }

    /// Value bound when the caller binds nothing.
    pub fn default(&self) -> Option<&Arc<Tensor>> {
        self.default.as_ref()
    }
}

/// A function as supplied to [`ModelBuilder`](crate::ModelBuilder), before
/// linking and type resolution.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub(crate) name: String,
    pub(crate) expression: Expr,
    pub(crate) arguments: Vec<ArgumentDef>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, expression: Expr) -> Self {
        Self {
            name: name.into(),
            expression,
            arguments: Vec::new(),
        }
    }

    /// Defines a function from expression text.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, ModelError> {
        let name = name.into();
        match Expr::parse(text) {
            Ok(expression) => Ok(Self::new(name, expression)),
            Err(source) => Err(ModelError::Parse {
                function: name,
                source,
            }),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, tensor_type: TensorType) -> Self {
        self.arguments.push(ArgumentDef::new(name, tensor_type));
        self
    }

    pub fn with_argument_default(
        mut self,
        name: impl Into<String>,
        tensor_type: TensorType,
        default: impl Into<Arc<Tensor>>,
    ) -> Self {
        self.arguments
            .push(ArgumentDef::new(name, tensor_type).with_default(default));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A resolved function of a model.
///
/// Immutable once the model is built, except for the optimized form of a
/// tree ensemble, which is compiled at most once and then shared.
pub struct Function {
    name: String,
    expression: Expr,
    arguments: Vec<ArgumentDef>,
    return_type: TensorType,
    forest: OnceLock<Option<Arc<OptimizedForest>>>,
}

impl Function {
    pub(crate) fn new(def: FunctionDef, return_type: TensorType) -> Self {
        Self {
            name: def.name,
            expression: def.expression,
            arguments: def.arguments,
            return_type,
            forest: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn arguments(&self) -> &[ArgumentDef] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.arguments.iter().find(|a| a.name == name)
    }

    pub fn return_type(&self) -> &TensorType {
        &self.return_type
    }

    /// The optimized form of this function, compiling it on first use.
    ///
    /// `None` when the function is not a sum of condition trees or
    /// optimization is turned off.
    pub fn optimized(&self, config: &OptimizationConfig) -> Option<&Arc<OptimizedForest>> {
        if !config.tree_ensembles {
            return None;
        }
        self.forest
            .get_or_init(|| {
                let forest = OptimizedForest::build(self, config)?;
                info!(
                    event = "forest_compiled",
                    function = %self.name,
                    trees = forest.table().tree_count(),
                    bytes = forest.table().size_bytes(),
                    native = forest.is_native(),
                );
                Some(Arc::new(forest))
            })
            .as_ref()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("return_type", &self.return_type)
            .field("expression", &self.expression.to_string())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", argument.name, argument.tensor_type)?;
        }
        write!(f, ") -> {} = {}", self.return_type, self.expression)
    }
}
