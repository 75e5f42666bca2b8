use crate::error::ModelError;
use crate::neural_network::LayerDescriptor;
use ndarray::Array1;

/// Number of convolution blocks a sparse weight index may address.
pub const MAX_CONV_BLOCKS: usize = 19;

/// Scatters sparse `(block, weight)` pairs into a dense array of length [`MAX_CONV_BLOCKS`].
///
/// The result is normalized to sum to one. An empty or all-zero list yields an
/// all-zero array.
///
/// # Parameters
///
/// * `sparse` - Convolution-block indices and their weights
///
/// # Returns
///
/// - `Ok(Array1<f32>)` - Dense normalized block weights
/// - `Err(ModelError::ConfigurationError)` - If an index is out of range or a weight is negative or not finite
pub fn weight_array(sparse: &[(usize, f32)]) -> Result<Array1<f32>, ModelError> {
    let mut array = Array1::<f32>::zeros(MAX_CONV_BLOCKS);

    for &(index, weight) in sparse {
        if index >= MAX_CONV_BLOCKS {
            return Err(ModelError::ConfigurationError(format!(
                "convolution block index {} is out of range 0..{}",
                index, MAX_CONV_BLOCKS
            )));
        }
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "weight of convolution block {} must be non-negative and finite, got {}",
                index, weight
            )));
        }
        array[index] = weight;
    }

    let sum = array.sum();
    if sum > 0.0 {
        array /= sum;
    }

    Ok(array)
}

/// Dense subject and style weights aligned to the layers of a network.
///
/// Both vectors hold one weight per layer position and are cut to `depth`, the
/// number of layers that has to be evaluated: one past the deepest layer with a
/// strictly positive weight. Only activation layers ever receive a weight.
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::{Architecture, PoolingMethod};
/// use rustystyle::style_transfer::LayerWeights;
///
/// let vgg = Architecture::vgg19(PoolingMethod::Average);
/// let weights = LayerWeights::map(&vgg.layers, &[(0, 1.0)], &[], 1.0).unwrap();
///
/// // conv1_1, relu1_1
/// assert_eq!(weights.depth(), 2);
/// assert_eq!(weights.subject(), &[0.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LayerWeights {
    subject: Vec<f32>,
    style: Vec<f32>,
    depth: usize,
}

impl LayerWeights {
    /// Maps sparse convolution-block weights onto a layer sequence.
    ///
    /// # Parameters
    ///
    /// - `layers` - Layer descriptors in evaluation order; scanning stops at the first fully-connected layer
    /// - `subject` - Sparse content weights, normalized then scaled by `subject_ratio`
    /// - `style` - Sparse style weights, normalized
    /// - `subject_ratio` - Balance of content against style
    ///
    /// # Returns
    ///
    /// - `Ok(LayerWeights)` - Layer-aligned weights and the truncation depth
    /// - `Err(ModelError::ConfigurationError)` - If an index names a block the layers don't have,
    ///   the ratio is negative or not finite, or no layer ends up with a positive weight
    pub fn map(
        layers: &[LayerDescriptor],
        subject: &[(usize, f32)],
        style: &[(usize, f32)],
        subject_ratio: f32,
    ) -> Result<Self, ModelError> {
        if !(subject_ratio >= 0.0 && subject_ratio.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "subject ratio must be non-negative and finite, got {}",
                subject_ratio
            )));
        }

        let subject_blocks = weight_array(subject)? * subject_ratio;
        let style_blocks = weight_array(style)?;

        let layers = match layers.iter().position(LayerDescriptor::is_fully_connected) {
            Some(end) => &layers[..end],
            None => layers,
        };
        let block_count = layers.iter().filter(|layer| layer.is_activation()).count();

        if let Some(&(index, _)) = subject
            .iter()
            .chain(style)
            .find(|&&(index, _)| index >= block_count)
        {
            return Err(ModelError::ConfigurationError(format!(
                "convolution block {} requested but the network has {} blocks",
                index, block_count
            )));
        }

        let mut subject_weights = vec![0.0; layers.len()];
        let mut style_weights = vec![0.0; layers.len()];
        let mut depth = 0;
        let mut block = 0;

        for (l, layer) in layers.iter().enumerate() {
            if !layer.is_activation() {
                continue;
            }
            subject_weights[l] = subject_blocks.get(block).copied().unwrap_or(0.0);
            style_weights[l] = style_blocks.get(block).copied().unwrap_or(0.0);
            if subject_weights[l] > 0.0 || style_weights[l] > 0.0 {
                depth = l + 1;
            }
            block += 1;
        }

        if depth == 0 {
            return Err(ModelError::ConfigurationError(
                "no layer has a positive subject or style weight".to_string(),
            ));
        }

        subject_weights.truncate(depth);
        style_weights.truncate(depth);

        Ok(LayerWeights {
            subject: subject_weights,
            style: style_weights,
            depth,
        })
    }

    /// Content weight of every kept layer
    pub fn subject(&self) -> &[f32] {
        &self.subject
    }

    /// Style weight of every kept layer
    pub fn style(&self) -> &[f32] {
        &self.style
    }

    /// Number of layers that have to be evaluated
    pub fn depth(&self) -> usize {
        self.depth
    }
}
