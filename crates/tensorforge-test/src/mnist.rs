//! MNIST-shaped dense network fixtures.
//!
//! Weights are drawn from a seeded generator, and each layer can compute
//! its own forward pass in plain loops for use as a reference.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tensorforge_core::{Tensor, TensorType};
use tensorforge_eval::{FunctionDef, Model};

/// Pixels per image.
pub const PIXELS: usize = 784;

/// Output classes.
pub const CLASSES: usize = 10;

/// Sum of the softmax model output for an all-zero input.
pub const SOFTMAX_ZERO_SUM: f64 = -1.6372650861740112e-6;

/// A fully connected layer from dimension `input` to dimension `output`.
///
/// `weights` is row-major `[output][input]`, matching the dense layout of
/// `tensor(output[..],input[..])` when `output` sorts before `input`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub input: &'static str,
    pub output: &'static str,
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    pub fn random(
        input: &'static str,
        output: &'static str,
        inputs: usize,
        outputs: usize,
        seed: u64,
    ) -> Self {
        assert!(output < input, "output dimension must sort first");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let weights = (0..inputs * outputs)
            .map(|_| rng.random_range(-0.1..0.1))
            .collect();
        let bias = (0..outputs).map(|_| rng.random_range(-0.1..0.1)).collect();
        Self {
            input,
            output,
            inputs,
            outputs,
            weights,
            bias,
        }
    }

    pub fn weights_tensor(&self) -> Tensor {
        let spec = format!(
            "tensor({}[{}],{}[{}])",
            self.output, self.outputs, self.input, self.inputs
        );
        Tensor::from_values(tensor_type(&spec), self.weights.clone()).expect("weights fit their type")
    }

    pub fn bias_tensor(&self) -> Tensor {
        let spec = format!("tensor({}[{}])", self.output, self.outputs);
        Tensor::from_values(tensor_type(&spec), self.bias.clone()).expect("bias fits its type")
    }

    /// `weights · x + bias`.
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        (0..self.outputs)
            .map(|o| {
                let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
                row.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + self.bias[o]
            })
            .collect()
    }
}

fn tensor_type(spec: &str) -> TensorType {
    TensorType::from_spec(spec).expect("fixture type parses")
}

/// The declared type of every network input.
pub fn input_type() -> TensorType {
    tensor_type("tensor(d0[],d1[784])")
}

/// A batch of one image, `tensor(d0[],d1[784])` with `d0` of extent 1.
pub fn input_tensor(pixels: &[f64]) -> Tensor {
    let mut builder = Tensor::builder(input_type());
    for (i, value) in pixels.iter().enumerate() {
        builder.cell(*value, [0, i]);
    }
    builder.build().expect("input fits its type")
}

pub fn zero_input() -> Tensor {
    input_tensor(&[0.0; PIXELS])
}

pub fn random_pixels(seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..PIXELS).map(|_| rng.random_range(0.0..1.0)).collect()
}

/// The softmax layer: weights from `d2` (pixels) to `d1` (classes).
///
/// The bias sums to [`SOFTMAX_ZERO_SUM`].
pub fn softmax_layer() -> DenseLayer {
    let mut layer = DenseLayer::random("d2", "d1", PIXELS, CLASSES, 17);
    layer.bias = vec![
        0.125,
        -0.125,
        0.0625,
        -0.0625,
        0.25,
        -0.25,
        0.5,
        -0.5,
        0.0,
        SOFTMAX_ZERO_SUM,
    ];
    layer
}

/// A single linear layer model with one function, `function`, over the
/// argument `Placeholder`.
pub fn softmax_model(model: &str, function: &str) -> Model {
    let layer = softmax_layer();
    let weights = format!("{}_Variable", model);
    let bias = format!("{}_Variable_1", model);
    let expression = format!(
        "join(reduce(join(rename(Placeholder, (d0, d1), (d0, d2)), constant({}), f(a,b)(a * b)), sum, d2), constant({}), f(a,b)(a + b))",
        weights, bias
    );
    Model::builder(model)
        .with_constant(weights, layer.weights_tensor())
        .with_constant(bias, layer.bias_tensor())
        .with_function(
            FunctionDef::parse(function, &expression)
                .expect("fixture expression parses")
                .with_argument("Placeholder", input_type()),
        )
        .build()
        .expect("fixture model builds")
}

/// Name of the hidden layer function of [`two_layer_model`].
pub const HIDDEN1: &str = "imported_ml_function_mnist_saved_dnn_hidden1_add";

/// Layers of [`two_layer_model`], input first.
pub fn two_layer_layers() -> [DenseLayer; 3] {
    [
        DenseLayer::random("d4", "d3", PIXELS, 300, 1),
        DenseLayer::random("d3", "d2", 300, 100, 2),
        DenseLayer::random("d2", "d1", 100, CLASSES, 3),
    ]
}

/// A network with a leaky-relu hidden layer, a selu hidden layer and a
/// linear output, exposing `serving_default.y` over the argument `input`.
///
/// The first hidden layer is its own function, referenced twice.
pub fn two_layer_model() -> Model {
    let [hidden1, hidden2, outputs] = two_layer_layers();
    let hidden1_add = "join(reduce(join(rename(input, (d0, d1), (d0, d4)), constant(mnist_saved_dnn_hidden1_weights_read), f(a,b)(a * b)), sum, d4), constant(mnist_saved_dnn_hidden1_bias_read), f(a,b)(a + b))";
    let output = format!(
        "join(reduce(join(map(join(reduce(join(join(join(rankingExpression({h}), 0.009999999776482582, f(a,b)(a * b)), rankingExpression({h}), f(a,b)(max(a,b))), constant(mnist_saved_dnn_hidden2_weights_read), f(a,b)(a * b)), sum, d3), constant(mnist_saved_dnn_hidden2_bias_read), f(a,b)(a + b)), f(a)(1.050701 * if (a >= 0, a, 1.673263 * (exp(a) - 1)))), constant(mnist_saved_dnn_outputs_weights_read), f(a,b)(a * b)), sum, d2), constant(mnist_saved_dnn_outputs_bias_read), f(a,b)(a + b))",
        h = HIDDEN1
    );
    Model::builder("mnist_saved")
        .with_constant("mnist_saved_dnn_hidden1_weights_read", hidden1.weights_tensor())
        .with_constant("mnist_saved_dnn_hidden1_bias_read", hidden1.bias_tensor())
        .with_constant("mnist_saved_dnn_hidden2_weights_read", hidden2.weights_tensor())
        .with_constant("mnist_saved_dnn_hidden2_bias_read", hidden2.bias_tensor())
        .with_constant("mnist_saved_dnn_outputs_weights_read", outputs.weights_tensor())
        .with_constant("mnist_saved_dnn_outputs_bias_read", outputs.bias_tensor())
        .with_function(
            FunctionDef::parse(HIDDEN1, hidden1_add)
                .expect("fixture expression parses")
                .with_argument("input", input_type()),
        )
        .with_function(
            FunctionDef::parse("serving_default.y", &output)
                .expect("fixture expression parses")
                .with_argument("input", input_type()),
        )
        .build()
        .expect("fixture model builds")
}

/// The output of [`two_layer_model`] computed in plain loops.
pub fn two_layer_reference(pixels: &[f64]) -> Vec<f64> {
    let [hidden1, hidden2, outputs] = two_layer_layers();
    let h1: Vec<f64> = hidden1
        .forward(pixels)
        .into_iter()
        .map(|a| (a * 0.009999999776482582).max(a))
        .collect();
    let h2: Vec<f64> = hidden2
        .forward(&h1)
        .into_iter()
        .map(|a| 1.050701 * if a >= 0.0 { a } else { 1.673263 * (a.exp() - 1.0) })
        .collect();
    outputs.forward(&h2)
}
