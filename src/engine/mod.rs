pub mod adjustments;
pub mod calibration;
pub mod classifier;
pub mod predictor;

pub use classifier::{LogisticModel, WinClassifier};
pub use predictor::{PredictError, Predictor};
