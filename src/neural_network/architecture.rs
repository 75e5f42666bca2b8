use crate::error::{IoError, ModelError};
use crate::neural_network::layer::{PaddingType, PoolingMethod};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::from_reader;

/// VGG mean pixel in BGR order, on the 0..255 scale the network was trained with
pub const VGG_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Kind and hyper-parameters of one layer of a convolutional stack.
///
/// # Variants
///
/// - `Convolution` - A convolution with `filters` output channels
/// - `Activation` - A ReLU; the only layer kind at which losses are measured
/// - `Pooling` - A spatial down-sampling layer
/// - `FullyConnected` - A classifier layer; everything from the first one onwards is never evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Convolution {
        filters: usize,
        kernel_size: (usize, usize),
        strides: (usize, usize),
        padding: PaddingType,
    },
    Activation,
    Pooling {
        method: PoolingMethod,
        pool_size: (usize, usize),
        strides: (usize, usize),
    },
    FullyConnected {
        units: usize,
    },
}

/// One named entry of a layer-descriptor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub kind: LayerKind,
}

impl LayerDescriptor {
    fn convolution(name: &str, filters: usize) -> Self {
        LayerDescriptor {
            name: name.to_string(),
            kind: LayerKind::Convolution {
                filters,
                kernel_size: (3, 3),
                strides: (1, 1),
                padding: PaddingType::Same,
            },
        }
    }

    fn activation(name: &str) -> Self {
        LayerDescriptor {
            name: name.to_string(),
            kind: LayerKind::Activation,
        }
    }

    fn pooling(name: &str, method: PoolingMethod) -> Self {
        LayerDescriptor {
            name: name.to_string(),
            kind: LayerKind::Pooling {
                method,
                pool_size: (2, 2),
                strides: (2, 2),
            },
        }
    }

    fn fully_connected(name: &str, units: usize) -> Self {
        LayerDescriptor {
            name: name.to_string(),
            kind: LayerKind::FullyConnected { units },
        }
    }

    /// Returns `true` for activation layers
    pub fn is_activation(&self) -> bool {
        matches!(self.kind, LayerKind::Activation)
    }

    /// Returns `true` for convolution layers
    pub fn is_convolution(&self) -> bool {
        matches!(self.kind, LayerKind::Convolution { .. })
    }

    /// Returns `true` for fully-connected layers
    pub fn is_fully_connected(&self) -> bool {
        matches!(self.kind, LayerKind::FullyConnected { .. })
    }
}

/// Description of a pretrained convolutional network.
///
/// Holds the ordered layer-descriptor table together with the preprocessing the
/// network expects from its input images.
///
/// # Fields
///
/// - `name` - Human readable network name
/// - `input_channels` - Number of channels of the input image
/// - `mean` - Per-channel mean subtracted from the input, in network channel order
/// - `channel_swap` - `channel_swap[k]` is the RGB channel fed to network channel `k`
/// - `raw_scale` - Value a full-intensity pixel is mapped to before mean subtraction
/// - `layers` - Ordered layer descriptors
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::{Architecture, PoolingMethod};
///
/// let vgg = Architecture::vgg19(PoolingMethod::Average);
/// assert_eq!(vgg.conv_block_count(), 16);
/// assert_eq!(vgg.block_index("conv4_2"), Some(9));
/// assert_eq!(vgg.block_index("relu4_2"), Some(9));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub name: String,
    pub input_channels: usize,
    pub mean: Vec<f32>,
    pub channel_swap: Vec<usize>,
    pub raw_scale: f32,
    pub layers: Vec<LayerDescriptor>,
}

impl Architecture {
    /// The VGG-19 layer table ("very deep" 19-layer network).
    ///
    /// # Parameters
    ///
    /// - `pooling` - Reduction used by the five pooling layers
    ///
    /// # Returns
    ///
    /// * `Architecture` - 16 convolution blocks, 5 pooling layers and the fc6..fc8 terminators
    pub fn vgg19(pooling: PoolingMethod) -> Self {
        let blocks: [(usize, usize); 5] = [(2, 64), (2, 128), (4, 256), (4, 512), (4, 512)];

        let mut layers = Vec::new();
        for (stage, &(convs, filters)) in blocks.iter().enumerate() {
            let stage = stage + 1;
            for conv in 1..=convs {
                layers.push(LayerDescriptor::convolution(
                    &format!("conv{}_{}", stage, conv),
                    filters,
                ));
                layers.push(LayerDescriptor::activation(&format!(
                    "relu{}_{}",
                    stage, conv
                )));
            }
            layers.push(LayerDescriptor::pooling(&format!("pool{}", stage), pooling));
        }
        layers.push(LayerDescriptor::fully_connected("fc6", 4096));
        layers.push(LayerDescriptor::activation("relu6"));
        layers.push(LayerDescriptor::fully_connected("fc7", 4096));
        layers.push(LayerDescriptor::activation("relu7"));
        layers.push(LayerDescriptor::fully_connected("fc8", 1000));

        Architecture {
            name: "vgg19".to_string(),
            input_channels: 3,
            mean: VGG_MEAN_BGR.to_vec(),
            channel_swap: vec![2, 1, 0],
            raw_scale: 255.0,
            layers,
        }
    }

    /// Loads an architecture description from a JSON file and validates it.
    ///
    /// # Parameters
    ///
    /// * `path` - Path of the JSON file
    ///
    /// # Returns
    ///
    /// - `Ok(Architecture)` - The parsed architecture
    /// - `Err(IoError)` - File not found or JSON malformed
    pub fn from_path(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        let architecture: Architecture = from_reader(reader).map_err(IoError::JsonError)?;
        Ok(architecture)
    }

    /// Replaces the reduction of every pooling layer.
    pub fn with_pooling(mut self, pooling: PoolingMethod) -> Self {
        for layer in self.layers.iter_mut() {
            if let LayerKind::Pooling { method, .. } = &mut layer.kind {
                *method = pooling;
            }
        }
        self
    }

    /// Checks the layer table and the preprocessing specification.
    ///
    /// # Errors
    ///
    /// - `ModelError::BackendError` - Empty table, duplicate names, or zero-sized hyper-parameters
    /// - `ModelError::ConfigurationError` - `mean` or `channel_swap` does not fit `input_channels`,
    ///   or `channel_swap` is not a permutation
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::BackendError(format!(
                "architecture '{}' has no layers",
                self.name
            )));
        }

        let mut seen = AHashMap::with_capacity(self.layers.len());
        for (l, layer) in self.layers.iter().enumerate() {
            if let Some(previous) = seen.insert(layer.name.as_str(), l) {
                return Err(ModelError::BackendError(format!(
                    "layer name '{}' used at positions {} and {}",
                    layer.name, previous, l
                )));
            }
            let degenerate = match &layer.kind {
                LayerKind::Convolution {
                    filters,
                    kernel_size,
                    strides,
                    ..
                } => {
                    *filters == 0
                        || kernel_size.0 == 0
                        || kernel_size.1 == 0
                        || strides.0 == 0
                        || strides.1 == 0
                }
                LayerKind::Pooling {
                    pool_size, strides, ..
                } => pool_size.0 == 0 || pool_size.1 == 0 || strides.0 == 0 || strides.1 == 0,
                LayerKind::FullyConnected { units } => *units == 0,
                LayerKind::Activation => false,
            };
            if degenerate {
                return Err(ModelError::BackendError(format!(
                    "layer '{}' has a zero-sized hyper-parameter",
                    layer.name
                )));
            }
        }

        if self.mean.len() != self.input_channels {
            return Err(ModelError::ConfigurationError(format!(
                "architecture '{}' expects {} channels but the mean has {} values",
                self.name,
                self.input_channels,
                self.mean.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ModelError::ConfigurationError(
                "mean values must be finite".to_string(),
            ));
        }

        let mut sorted = self.channel_swap.clone();
        sorted.sort_unstable();
        if sorted != (0..self.input_channels).collect::<Vec<_>>() {
            return Err(ModelError::ConfigurationError(format!(
                "channel_swap {:?} is not a permutation of {} channels",
                self.channel_swap, self.input_channels
            )));
        }

        if !(self.raw_scale > 0.0 && self.raw_scale.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "raw_scale must be positive and finite, got {}",
                self.raw_scale
            )));
        }

        Ok(())
    }

    /// Layers before the first fully-connected terminator.
    pub fn feature_layers(&self) -> &[LayerDescriptor] {
        let end = self
            .layers
            .iter()
            .position(LayerDescriptor::is_fully_connected)
            .unwrap_or(self.layers.len());
        &self.layers[..end]
    }

    /// Number of convolution blocks (activation layers) before the first fully-connected layer.
    pub fn conv_block_count(&self) -> usize {
        self.feature_layers()
            .iter()
            .filter(|layer| layer.is_activation())
            .count()
    }

    /// Maps layer names to convolution-block indices.
    ///
    /// Every activation layer opens a block; the activation and the convolution
    /// feeding it both map to that block, so `conv4_2` and `relu4_2` are the same block.
    pub fn block_names(&self) -> AHashMap<String, usize> {
        let mut names = AHashMap::new();
        let mut pending_convolution: Option<&str> = None;
        let mut block = 0;

        for layer in self.feature_layers() {
            match layer.kind {
                LayerKind::Convolution { .. } => pending_convolution = Some(layer.name.as_str()),
                LayerKind::Activation => {
                    if let Some(conv) = pending_convolution.take() {
                        names.insert(conv.to_string(), block);
                    }
                    names.insert(layer.name.clone(), block);
                    block += 1;
                }
                _ => pending_convolution = None,
            }
        }

        names
    }

    /// Resolves a layer name to its convolution-block index.
    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.block_names().get(name).copied()
    }
}
