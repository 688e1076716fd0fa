//! Closed set of activation functions
//!
//! Model blocks select their nonlinearity from this enum at construction
//! time. Name strings only exist at configuration boundaries, where
//! [`FromStr`] turns them into a variant once.

use std::str::FromStr;

use burn::prelude::*;
use burn::tensor::activation::{gelu, leaky_relu, relu, sigmoid};
use thiserror::Error;

/// Negative slope used by [`Activation::LeakyRelu`].
const LEAKY_RELU_SLOPE: f64 = 0.01;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ActivationError {
    #[error("unknown activation: {0}")]
    Unknown(String),
}

/// Activation kinds supported by the model blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Rectified linear unit
    #[default]
    Relu,
    /// Leaky rectified linear unit with slope 0.01
    LeakyRelu,
    /// Gaussian error linear unit
    Gelu,
    /// SiLU/Swish: `x * sigmoid(x)`
    Silu,
    /// Logistic sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    /// Applies the activation elementwise.
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu => relu(x),
            Activation::LeakyRelu => leaky_relu(x, LEAKY_RELU_SLOPE),
            Activation::Gelu => gelu(x),
            Activation::Silu => x.clone() * sigmoid(x),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Configuration name of this activation.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Gelu => "gelu",
            Activation::Silu => "silu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }
}

impl FromStr for Activation {
    type Err = ActivationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "relu" => Ok(Activation::Relu),
            "leaky_relu" => Ok(Activation::LeakyRelu),
            "gelu" => Ok(Activation::Gelu),
            "silu" => Ok(Activation::Silu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            _ => Err(ActivationError::Unknown(name.to_string())),
        }
    }
}
