use crate::error::{IoError, ModelError};
use crate::neural_network::{Architecture, PoolingMethod};
use crate::style_transfer::layer_weights::MAX_CONV_BLOCKS;
use serde::{Deserialize, Serialize};
use serde_json::from_reader;

/// Update rule used to move the image along its gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl std::str::FromStr for OptimizerKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adam" => Ok(OptimizerKind::Adam),
            "sgd" => Ok(OptimizerKind::Sgd),
            other => Err(ModelError::ConfigurationError(format!(
                "unknown optimizer '{}', expected 'adam' or 'sgd'",
                other
            ))),
        }
    }
}

/// Everything a style transfer run needs.
///
/// Block weights are written as `block=weight`, where `block` is either a
/// convolution-block index or the name of a convolution or activation layer
/// (`conv4_2`, `relu4_2`). A bare block means weight 1.
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::{Architecture, PoolingMethod};
/// use rustystyle::style_transfer::StyleConfig;
///
/// let config = StyleConfig::default();
/// let vgg = Architecture::vgg19(PoolingMethod::Average);
/// let (subject, style) = config.block_weights(&vgg).unwrap();
///
/// assert_eq!(subject, vec![(9, 1.0)]);
/// assert_eq!(style.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Image whose content is kept
    pub subject: String,
    /// Image whose texture is transferred
    pub style: String,
    /// Where the result is written
    pub output: String,
    /// JSON architecture description; the built-in VGG-19 table when absent
    pub network: Option<String>,
    /// JSON file with the pretrained convolution filters
    pub weights: String,
    pub pooling: PoolingMethod,
    pub subject_weights: Vec<String>,
    pub style_weights: Vec<String>,
    /// Balance of content against style
    pub subject_ratio: f32,
    /// Share of Gaussian noise in the initial image
    pub init_noise: f32,
    pub seed: u64,
    /// Coefficient of the Laplacian smoothness term
    pub smoothness: f32,
    pub optimizer: OptimizerKind,
    pub learning_rate: f32,
    pub iterations: usize,
    /// Directory receiving an intermediate image every `animation_rate` iterations
    pub animation_dir: Option<String>,
    pub animation_rate: usize,
}

impl Default for StyleConfig {
    fn default() -> Self {
        StyleConfig {
            subject: String::new(),
            style: String::new(),
            output: "out.png".to_string(),
            network: None,
            weights: "vgg19.json".to_string(),
            pooling: PoolingMethod::Average,
            subject_weights: vec!["conv4_2=1".to_string()],
            style_weights: ["conv1_1", "conv2_1", "conv3_1", "conv4_1", "conv5_1"]
                .iter()
                .map(|name| format!("{}=1", name))
                .collect(),
            subject_ratio: 2e-2,
            init_noise: 0.0,
            seed: 0,
            smoothness: 5e-8,
            optimizer: OptimizerKind::Adam,
            learning_rate: 2.0,
            iterations: 500,
            animation_dir: None,
            animation_rate: 1,
        }
    }
}

impl StyleConfig {
    /// Reads a configuration from a JSON file; absent fields take their default.
    pub fn from_path(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        let config: StyleConfig = from_reader(reader).map_err(IoError::JsonError)?;
        Ok(config)
    }

    /// Checks the numeric run parameters.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigurationError` naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), ModelError> {
        let fail = |msg: String| Err(ModelError::ConfigurationError(msg));

        if !(self.subject_ratio >= 0.0 && self.subject_ratio.is_finite()) {
            return fail(format!(
                "subject_ratio must be non-negative and finite, got {}",
                self.subject_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.init_noise) {
            return fail(format!("init_noise must be in [0, 1], got {}", self.init_noise));
        }
        if !(self.smoothness >= 0.0 && self.smoothness.is_finite()) {
            return fail(format!(
                "smoothness must be non-negative and finite, got {}",
                self.smoothness
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return fail(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            ));
        }
        if self.iterations == 0 {
            return fail("iterations must be at least 1".to_string());
        }
        if self.animation_rate == 0 {
            return fail("animation_rate must be at least 1".to_string());
        }
        Ok(())
    }

    /// Resolves the subject and style weight lists against an architecture.
    ///
    /// # Returns
    ///
    /// - `Ok((subject, style))` - Sparse `(block, weight)` lists
    /// - `Err(ModelError::ConfigurationError)` - If an entry is malformed or names an unknown layer
    pub fn block_weights(
        &self,
        architecture: &Architecture,
    ) -> Result<(Vec<(usize, f32)>, Vec<(usize, f32)>), ModelError> {
        let resolve = |specs: &[String]| -> Result<Vec<(usize, f32)>, ModelError> {
            specs
                .iter()
                .map(|spec| parse_weight_spec(spec, architecture))
                .collect()
        };
        Ok((resolve(&self.subject_weights)?, resolve(&self.style_weights)?))
    }
}

/// Parses one `block=weight` entry.
///
/// # Parameters
///
/// - `spec` - `conv4_2=0.5`, `relu4_2`, `9=0.5` or `9`
/// - `architecture` - Resolves layer names to block indices
///
/// # Returns
///
/// - `Ok((usize, f32))` - Block index and weight
/// - `Err(ModelError::ConfigurationError)` - Unknown layer, index out of range or unparsable weight
pub fn parse_weight_spec(spec: &str, architecture: &Architecture) -> Result<(usize, f32), ModelError> {
    let (block, weight) = match spec.split_once('=') {
        Some((block, weight)) => {
            let weight = weight.trim().parse::<f32>().map_err(|e| {
                ModelError::ConfigurationError(format!("invalid weight in '{}': {}", spec, e))
            })?;
            (block.trim(), weight)
        }
        None => (spec.trim(), 1.0),
    };

    let index = match block.parse::<usize>() {
        Ok(index) => index,
        Err(_) => architecture.block_index(block).ok_or_else(|| {
            ModelError::ConfigurationError(format!(
                "'{}' is not a convolution or activation layer of '{}'",
                block, architecture.name
            ))
        })?,
    };

    if index >= MAX_CONV_BLOCKS {
        return Err(ModelError::ConfigurationError(format!(
            "convolution block index {} is out of range 0..{}",
            index, MAX_CONV_BLOCKS
        )));
    }

    Ok((index, weight))
}
