//! Cranelift code generation for compacted tree ensembles.
//!
//! # Calling Convention
//!
//! The compiled function takes a single pointer to the feature vector and
//! returns the sum of the trees. Feature `i` is read with
//!
//! ```text
//! value = load.f64(features + i * 8)
//! ```
//!
//! # Fallback
//!
//! Compilation failures are returned as [`JitError`]; the caller keeps
//! evaluating the branch table.

use std::fmt;

use cranelift_codegen::ir::condcodes::FloatCC;
use cranelift_codegen::ir::types::{F64, I8};
use cranelift_codegen::ir::{
    AbiParam, Block, Function, InstBuilder, MemFlags, Signature, UserFuncName, Value,
};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{Linkage, Module};
use tensorforge_expr::BinaryOp;
use thiserror::Error;

use crate::gbdt::{CompactForest, Node, Test};

/// Native compilation failed.
#[derive(Debug, Error)]
pub enum JitError {
    #[error("target not supported: {0}")]
    Target(String),

    #[error("module: {0}")]
    Module(String),

    #[error("unsupported condition: {0}")]
    Unsupported(String),

    #[error("native forest reads {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// A tree ensemble compiled to machine code. Owns the code memory.
pub struct NativeForest {
    _module: JITModule,
    ptr: *const u8,
    feature_count: usize,
}

// SAFETY: JITModule owns the code memory, which is never written after
// finalization. ptr is valid for the module's lifetime.
unsafe impl Send for NativeForest {}
unsafe impl Sync for NativeForest {}

impl NativeForest {
    /// Compiles every tree of `forest` into one native function.
    pub fn compile(forest: &CompactForest) -> Result<Self, JitError> {
        let (module, ptr) = compile_function(forest)?;
        Ok(Self {
            _module: module,
            ptr,
            feature_count: forest.feature_count(),
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Sums the trees for `features`.
    ///
    /// Fails with [`JitError::FeatureCount`] if `features` is shorter than
    /// [`feature_count`](Self::feature_count); the compiled code reads
    /// every feature slot without bounds checks.
    #[inline]
    pub fn evaluate(&self, features: &[f64]) -> Result<f64, JitError> {
        if features.len() < self.feature_count {
            return Err(JitError::FeatureCount {
                expected: self.feature_count,
                actual: features.len(),
            });
        }
        let f: unsafe extern "C" fn(*const f64) -> f64 = unsafe { std::mem::transmute(self.ptr) };
        Ok(unsafe { f(features.as_ptr()) })
    }
}

impl fmt::Debug for NativeForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeForest")
            .field("feature_count", &self.feature_count)
            .finish_non_exhaustive()
    }
}

fn make_jit_module() -> Result<JITModule, JitError> {
    let setting = |e: settings::SetError| JitError::Target(e.to_string());
    let mut flag_builder = settings::builder();
    flag_builder
        .set("use_colocated_libcalls", "false")
        .map_err(setting)?;
    flag_builder.set("is_pic", "false").map_err(setting)?;
    flag_builder.set("opt_level", "speed").map_err(setting)?;
    let isa_builder = cranelift_native::builder().map_err(|e| JitError::Target(e.to_string()))?;
    let isa = isa_builder
        .finish(settings::Flags::new(flag_builder))
        .map_err(|e| JitError::Target(e.to_string()))?;
    let builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
    Ok(JITModule::new(builder))
}

fn compile_function(forest: &CompactForest) -> Result<(JITModule, *const u8), JitError> {
    let module_error = |e: cranelift_module::ModuleError| JitError::Module(e.to_string());

    let mut module = make_jit_module()?;
    let target = module.target_config();
    let mut sig = Signature::new(target.default_call_conv);
    sig.params.push(AbiParam::new(target.pointer_type()));
    sig.returns.push(AbiParam::new(F64));

    let func_id = module
        .declare_function("forest", Linkage::Local, &sig)
        .map_err(module_error)?;
    let mut func = Function::with_name_signature(UserFuncName::user(0, 0), sig);
    let mut func_ctx = FunctionBuilderContext::new();

    {
        let mut builder = FunctionBuilder::new(&mut func, &mut func_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let features = builder.block_params(entry)[0];

        let mut sum: Option<Value> = None;
        for &root in forest.roots() {
            let exit = builder.create_block();
            builder.append_block_param(exit, F64);
            emit_node(&mut builder, forest, root, features, exit)?;

            builder.switch_to_block(exit);
            let value = builder.block_params(exit)[0];
            sum = Some(match sum {
                Some(total) => builder.ins().fadd(total, value),
                None => value,
            });
        }
        let result = match sum {
            Some(total) => total,
            None => builder.ins().f64const(0.0),
        };
        builder.ins().return_(&[result]);
        builder.seal_all_blocks();
        builder.finalize();
    }

    let mut ctx = Context::for_function(func);
    module
        .define_function(func_id, &mut ctx)
        .map_err(module_error)?;
    module.clear_context(&mut ctx);
    module.finalize_definitions().map_err(module_error)?;

    let ptr = module.get_finalized_function(func_id);
    Ok((module, ptr))
}

/// Emits the subtree at `node` into the current block. Every path ends in
/// a jump to `exit` carrying the leaf value.
fn emit_node(
    builder: &mut FunctionBuilder,
    forest: &CompactForest,
    node: u32,
    features: Value,
    exit: Block,
) -> Result<(), JitError> {
    let Some(&node) = forest.nodes().get(node as usize) else {
        return Err(JitError::Unsupported(format!("node {} is out of range", node)));
    };
    match node {
        Node::Leaf(value) => {
            let value = builder.ins().f64const(value);
            builder.ins().jump(exit, &[value]);
        }
        Node::Branch {
            feature,
            test,
            then_node,
            else_node,
        } => {
            let offset = (feature as usize)
                .checked_mul(8)
                .and_then(|o| i32::try_from(o).ok())
                .ok_or_else(|| JitError::Unsupported(format!("feature {} is out of range", feature)))?;
            let x = builder.ins().load(F64, MemFlags::trusted(), features, offset);
            let condition = emit_test(builder, forest, test, x)?;

            let then_block = builder.create_block();
            let else_block = builder.create_block();
            builder
                .ins()
                .brif(condition, then_block, &[], else_block, &[]);

            builder.switch_to_block(then_block);
            emit_node(builder, forest, then_node, features, exit)?;
            builder.switch_to_block(else_block);
            emit_node(builder, forest, else_node, features, exit)?;
        }
    }
    Ok(())
}

/// An `i8` that is nonzero when the test passes for `x`.
fn emit_test(
    builder: &mut FunctionBuilder,
    forest: &CompactForest,
    test: Test,
    x: Value,
) -> Result<Value, JitError> {
    match test {
        Test::Compare { op, value, swapped } => {
            let cc = float_cc(op)?;
            let c = builder.ins().f64const(value);
            Ok(if swapped {
                builder.ins().fcmp(cc, c, x)
            } else {
                builder.ins().fcmp(cc, x, c)
            })
        }
        Test::Member { start, len } => {
            let mut any = builder.ins().iconst(I8, 0);
            for &member in forest.set(start, len) {
                let c = builder.ins().f64const(member);
                let equal = builder.ins().fcmp(FloatCC::Equal, x, c);
                any = builder.ins().bor(any, equal);
            }
            Ok(any)
        }
    }
}

/// Float condition codes with the same NaN behavior as the Rust operators.
fn float_cc(op: BinaryOp) -> Result<FloatCC, JitError> {
    Ok(match op {
        BinaryOp::Lt => FloatCC::LessThan,
        BinaryOp::Le => FloatCC::LessThanOrEqual,
        BinaryOp::Gt => FloatCC::GreaterThan,
        BinaryOp::Ge => FloatCC::GreaterThanOrEqual,
        BinaryOp::Eq => FloatCC::Equal,
        BinaryOp::Ne => FloatCC::NotEqual,
        other => return Err(JitError::Unsupported(other.to_string())),
    })
}
