use crate::error::ModelError;
use crate::neural_network::Tensor;
use crate::neural_network::architecture::{Architecture, LayerDescriptor, LayerKind};
use crate::neural_network::layer::{AveragePooling2D, Conv2D, MaxPooling2D, PoolingMethod, ReLU};
use crate::neural_network::neural_network_trait::Layer;
use crate::neural_network::pretrained::PretrainedWeights;
use log::debug;

/// A descriptor bound to the layer that evaluates it.
pub struct NetworkLayer {
    descriptor: LayerDescriptor,
    layer: Box<dyn Layer>,
}

impl NetworkLayer {
    /// Returns the descriptor of this layer
    pub fn descriptor(&self) -> &LayerDescriptor {
        &self.descriptor
    }

    /// Returns the evaluating layer
    pub fn layer(&self) -> &dyn Layer {
        self.layer.as_ref()
    }
}

/// The feature-extracting part of a pretrained convolutional network.
///
/// Holds the layers before the first fully-connected terminator. Every layer is
/// stateless, so the network is shared immutably by all forward and backward
/// passes, including concurrent ones.
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::*;
/// use ndarray::{Array2, Array4};
///
/// let architecture = Architecture {
///     name: "tiny".to_string(),
///     input_channels: 1,
///     mean: vec![0.0],
///     channel_swap: vec![0],
///     raw_scale: 1.0,
///     layers: vec![
///         LayerDescriptor {
///             name: "conv1_1".to_string(),
///             kind: LayerKind::Convolution {
///                 filters: 2,
///                 kernel_size: (3, 3),
///                 strides: (1, 1),
///                 padding: PaddingType::Same,
///             },
///         },
///         LayerDescriptor { name: "relu1_1".to_string(), kind: LayerKind::Activation },
///     ],
/// };
///
/// let mut weights = PretrainedWeights::new();
/// let conv = Conv2D::new(Array4::ones((2, 1, 3, 3)), Array2::zeros((1, 2)), (1, 1), PaddingType::Same).unwrap();
/// weights.insert("conv1_1", &conv);
///
/// let network = Network::from_pretrained(&architecture, &weights).unwrap();
/// let output = network.forward(&Array4::ones((1, 1, 5, 5)).into_dyn()).unwrap();
/// assert_eq!(output.shape(), &[1, 2, 5, 5]);
/// ```
pub struct Network {
    name: String,
    layers: Vec<NetworkLayer>,
}

impl Network {
    /// Instantiates every layer of `architecture` before its first fully-connected layer.
    ///
    /// # Parameters
    ///
    /// - `architecture` - Layer-descriptor table and preprocessing specification
    /// - `weights` - Pretrained filters keyed by convolution layer name
    ///
    /// # Returns
    ///
    /// - `Ok(Network)` - The instantiated feature layers
    /// - `Err(ModelError::BackendError)` - Missing or malformed filters for a convolution layer
    /// - `Err(ModelError::ConfigurationError)` - Invalid preprocessing specification
    pub fn from_pretrained(
        architecture: &Architecture,
        weights: &PretrainedWeights,
    ) -> Result<Self, ModelError> {
        architecture.validate()?;

        let mut channels = architecture.input_channels;
        let mut layers = Vec::new();

        for descriptor in architecture.feature_layers() {
            let layer: Box<dyn Layer> = match &descriptor.kind {
                LayerKind::Convolution {
                    filters,
                    kernel_size,
                    strides,
                    padding,
                } => {
                    let stored = weights.layers.get(&descriptor.name).ok_or_else(|| {
                        ModelError::BackendError(format!(
                            "no pretrained weights for layer '{}'",
                            descriptor.name
                        ))
                    })?;
                    let (filter_weights, bias) = stored
                        .to_arrays()
                        .map_err(|e| ModelError::BackendError(e.to_string()))?;

                    let expected = [*filters, channels, kernel_size.0, kernel_size.1];
                    if filter_weights.shape() != expected {
                        return Err(ModelError::BackendError(format!(
                            "weights of layer '{}' have shape {:?}, expected {:?}",
                            descriptor.name,
                            filter_weights.shape(),
                            expected
                        )));
                    }
                    channels = *filters;

                    let conv = Conv2D::new(filter_weights, bias, *strides, *padding)
                        .map_err(|e| ModelError::BackendError(e.to_string()))?;
                    Box::new(conv)
                }
                LayerKind::Activation => Box::new(ReLU::new()),
                LayerKind::Pooling {
                    method,
                    pool_size,
                    strides,
                } => match method {
                    PoolingMethod::Max => Box::new(MaxPooling2D::new(*pool_size, Some(*strides))?),
                    PoolingMethod::Average => {
                        Box::new(AveragePooling2D::new(*pool_size, Some(*strides))?)
                    }
                },
                LayerKind::FullyConnected { .. } => {
                    return Err(ModelError::BackendError(format!(
                        "fully-connected layer '{}' cannot be evaluated",
                        descriptor.name
                    )));
                }
            };

            layers.push(NetworkLayer {
                descriptor: descriptor.clone(),
                layer,
            });
        }

        debug!(
            "instantiated {} feature layers of '{}'",
            layers.len(),
            architecture.name
        );

        Ok(Network {
            name: architecture.name.clone(),
            layers,
        })
    }

    /// Returns the network name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the network has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the layers in evaluation order
    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    /// Returns the descriptors in evaluation order
    pub fn descriptors(&self) -> Vec<LayerDescriptor> {
        self.layers
            .iter()
            .map(|layer| layer.descriptor.clone())
            .collect()
    }

    /// Drops every layer at position `depth` and beyond.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigurationError` if `depth` is zero or exceeds the network length.
    pub fn truncate(&mut self, depth: usize) -> Result<(), ModelError> {
        if depth == 0 || depth > self.layers.len() {
            return Err(ModelError::ConfigurationError(format!(
                "cannot truncate a {}-layer network to {} layers",
                self.layers.len(),
                depth
            )));
        }
        self.layers.truncate(depth);
        Ok(())
    }

    fn get(&self, l: usize) -> Result<&NetworkLayer, ModelError> {
        self.layers.get(l).ok_or_else(|| {
            ModelError::ProcessingError(format!(
                "layer index {} out of range for {} layers",
                l,
                self.layers.len()
            ))
        })
    }

    /// Evaluates layer `l` on `input`.
    pub fn forward_layer(&self, l: usize, input: &Tensor) -> Result<Tensor, ModelError> {
        self.get(l)?.layer.forward(input)
    }

    /// Propagates `grad_output` back through layer `l`.
    ///
    /// # Parameters
    ///
    /// - `l` - Layer position
    /// - `input` - The input layer `l` received during the forward pass
    /// - `grad_output` - Gradient with respect to the output of layer `l`
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - Gradient with respect to the input of layer `l`
    /// - `Err(ModelError::ShapeError)` - If the tensors do not fit the layer
    pub fn backward_layer(
        &self,
        l: usize,
        input: &Tensor,
        grad_output: &Tensor,
    ) -> Result<Tensor, ModelError> {
        self.get(l)?.layer.backward(input, grad_output)
    }

    /// Evaluates all layers in order.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor, ModelError> {
        let mut next = input.clone();
        for layer in &self.layers {
            next = layer.layer.forward(&next)?;
        }
        Ok(next)
    }

    /// Computes the output shape of every layer for an input shape.
    pub fn output_shapes(&self, input_shape: &[usize]) -> Result<Vec<Vec<usize>>, ModelError> {
        let mut shape = input_shape.to_vec();
        let mut shapes = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            shape = layer.layer.output_shape(&shape)?;
            debug!("{:<10} {:?}", layer.descriptor.name, shape);
            shapes.push(shape.clone());
        }
        Ok(shapes)
    }

    /// Returns the total number of pretrained parameters
    pub fn param_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| layer.layer.param_count())
            .sum()
    }
}
