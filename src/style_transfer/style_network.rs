use crate::error::ModelError;
use crate::neural_network::{Network, Tensor};
use crate::style_transfer::gram::{flatten, gram_of_flat, pixel_count};
use crate::style_transfer::image_parameter::ImageParameter;
use crate::style_transfer::layer_weights::LayerWeights;
use crate::style_transfer::smoothness::smoothness_gradient;
use log::{debug, trace};
use ndarray::Array2;

/// Added to the per-layer gradient norms so that a vanishing difference can't divide by zero.
const NORM_EPSILON: f32 = 1e-8;

fn check_image(image: &Tensor, what: &str) -> Result<(), ModelError> {
    if image.ndim() != 4 || image.shape()[0] != 1 {
        return Err(ModelError::ShapeError(format!(
            "{} image must have shape (1, channels, height, width), got {:?}",
            what,
            image.shape()
        )));
    }
    Ok(())
}

/// Forwards `input` through the network, capturing a value after every layer with a positive weight.
fn forward_capture<T, F>(
    network: &Network,
    input: &Tensor,
    weights: &[f32],
    mut capture: F,
) -> Result<Vec<Option<T>>, ModelError>
where
    F: FnMut(usize, &Tensor) -> Result<T, ModelError>,
{
    let mut captured = Vec::with_capacity(weights.len());
    let mut next = input.clone();
    for (l, &weight) in weights.iter().enumerate() {
        next = network.forward_layer(l, &next)?;
        captured.push(if weight > 0.0 {
            Some(capture(l, &next)?)
        } else {
            None
        });
    }
    Ok(captured)
}

/// A pretrained network turned into the loss of a style transfer.
///
/// Construction maps the sparse block weights onto the layers, drops every
/// layer past the deepest weighted one and captures the subject activations
/// and the style Gram matrices once. After that the network only evaluates
/// candidate images: [`StyleNetwork::evaluate`] returns the loss and its
/// gradient with respect to the image and mutates nothing.
///
/// Index `l` of the weights and of both caches refers to layer `l` of the
/// truncated network.
///
/// # Loss
///
/// At every content layer with activation `x` and subject activation `s`:
/// `diff = x - s`, the layer weight is divided by `sum(|diff|)`, and the layer
/// adds `0.5 * weight * sum(diff²)`.
///
/// At every style layer with Gram matrix `G(x)` and cached style Gram `A`:
/// `diff = G(x) - A`, the gradient is `diff · x` (with `x` flattened to
/// `(channels, pixels)`), the layer weight is divided by the sum of its
/// absolute values, and the layer adds `0.25 * weight * sum(diff²)`.
pub struct StyleNetwork {
    network: Network,
    subject_weights: Vec<f32>,
    style_weights: Vec<f32>,
    subject_feats: Vec<Option<Tensor>>,
    style_grams: Vec<Option<Array2<f32>>>,
    smoothness: f32,
}

impl StyleNetwork {
    /// Builds the loss network and precomputes the subject and style targets.
    ///
    /// # Parameters
    ///
    /// - `network` - Feature layers of a pretrained network; truncated in place
    /// - `subject` - Preprocessed subject image `(1, channels, height, width)`
    /// - `style` - Preprocessed style image, any spatial size
    /// - `subject_weights` - Sparse content weights per convolution block
    /// - `style_weights` - Sparse style weights per convolution block
    /// - `subject_ratio` - Balance of content against style
    /// - `smoothness` - Coefficient of the Laplacian smoothness term, zero to disable
    ///
    /// # Returns
    ///
    /// - `Ok(StyleNetwork)` - Ready to evaluate candidate images
    /// - `Err(ModelError::ConfigurationError)` - Invalid weights, ratio or smoothness
    /// - `Err(ModelError::ShapeError)` - If an image does not fit the network
    pub fn new(
        mut network: Network,
        subject: &Tensor,
        style: &Tensor,
        subject_weights: &[(usize, f32)],
        style_weights: &[(usize, f32)],
        subject_ratio: f32,
        smoothness: f32,
    ) -> Result<Self, ModelError> {
        if !(smoothness >= 0.0 && smoothness.is_finite()) {
            return Err(ModelError::ConfigurationError(format!(
                "smoothness must be non-negative and finite, got {}",
                smoothness
            )));
        }
        check_image(subject, "subject")?;
        check_image(style, "style")?;

        let weights = LayerWeights::map(
            &network.descriptors(),
            subject_weights,
            style_weights,
            subject_ratio,
        )?;
        let layer_count = network.len();
        network.truncate(weights.depth())?;
        debug!(
            "evaluating {} of {} layers of '{}'",
            network.len(),
            layer_count,
            network.name()
        );

        let subject_pixels: Vec<usize> = network
            .output_shapes(subject.shape())?
            .iter()
            .map(|shape| shape[2..].iter().product())
            .collect();

        let (subject_feats, style_grams) = rayon::join(
            || forward_capture(&network, subject, weights.subject(), |_, x| Ok(x.to_owned())),
            || {
                forward_capture(&network, style, weights.style(), |l, x| {
                    let flat = flatten(x)?;
                    let scale = subject_pixels[l] as f32 / pixel_count(x)? as f32;
                    Ok(gram_of_flat(flat.view()) * scale)
                })
            },
        );

        Ok(StyleNetwork {
            network,
            subject_weights: weights.subject().to_vec(),
            style_weights: weights.style().to_vec(),
            subject_feats: subject_feats?,
            style_grams: style_grams?,
            smoothness,
        })
    }

    /// Computes the loss of a candidate image and its gradient with respect to the image.
    ///
    /// # Parameters
    ///
    /// * `image` - Candidate image with the subject's shape
    ///
    /// # Returns
    ///
    /// - `Ok((f32, Tensor))` - Loss and pixel-space gradient of the same shape as `image`
    /// - `Err(ModelError::ShapeError)` - If `image` does not have the subject's shape
    pub fn evaluate(&self, image: &Tensor) -> Result<(f32, Tensor), ModelError> {
        check_image(image, "candidate")?;
        let depth = self.network.len();

        // inputs[l] is the input of layer l, inputs[depth] the output of the last layer
        let mut inputs = Vec::with_capacity(depth + 1);
        inputs.push(image.clone());
        for l in 0..depth {
            let output = self.network.forward_layer(l, &inputs[l])?;
            inputs.push(output);
        }

        let mut grad = Tensor::zeros(inputs[depth].raw_dim());
        let mut loss = 0.0;

        for l in (0..depth).rev() {
            let x = &inputs[l + 1];

            if self.subject_weights[l] > 0.0 {
                let (layer_loss, layer_grad) = self.content_term(l, x)?;
                trace!("layer {} content loss {}", l, layer_loss);
                loss += layer_loss;
                grad += &layer_grad;
            }

            if self.style_weights[l] > 0.0 {
                let (layer_loss, layer_grad) = self.style_term(l, x)?;
                trace!("layer {} style loss {}", l, layer_loss);
                loss += layer_loss;
                grad += &layer_grad;
            }

            grad = self.network.backward_layer(l, &inputs[l], &grad)?;
        }

        if let Some(smoothness_grad) = smoothness_gradient(image, self.smoothness)? {
            grad += &smoothness_grad;
        }

        Ok((loss, grad))
    }

    fn content_term(&self, l: usize, x: &Tensor) -> Result<(f32, Tensor), ModelError> {
        let feat = self.subject_feats[l].as_ref().ok_or_else(|| {
            ModelError::ProcessingError(format!("no subject activation cached for layer {}", l))
        })?;
        if x.shape() != feat.shape() {
            return Err(ModelError::ShapeError(format!(
                "activation of layer {} has shape {:?}, the subject's has {:?}",
                l,
                x.shape(),
                feat.shape()
            )));
        }

        let diff = x - feat;
        let norm = diff.iter().map(|d| d.abs()).sum::<f32>() + NORM_EPSILON;
        let weight = self.subject_weights[l] / norm;
        let loss = 0.5 * weight * diff.iter().map(|d| d * d).sum::<f32>();

        Ok((loss, diff * weight))
    }

    fn style_term(&self, l: usize, x: &Tensor) -> Result<(f32, Tensor), ModelError> {
        let style_gram = self.style_grams[l].as_ref().ok_or_else(|| {
            ModelError::ProcessingError(format!("no style Gram matrix cached for layer {}", l))
        })?;

        let flat = flatten(x)?;
        let gram = gram_of_flat(flat.view());
        if gram.shape() != style_gram.shape() {
            return Err(ModelError::ShapeError(format!(
                "Gram matrix of layer {} has shape {:?}, the style's has {:?}",
                l,
                gram.shape(),
                style_gram.shape()
            )));
        }

        let diff = gram - style_gram;
        let mut style_grad = diff
            .dot(&flat.view())
            .into_shape_with_order(x.raw_dim())
            .map_err(|e| ModelError::ShapeError(e.to_string()))?;

        let norm = style_grad.iter().map(|g| g.abs()).sum::<f32>() + NORM_EPSILON;
        let weight = self.style_weights[l] / norm;
        style_grad.par_mapv_inplace(|g| g * weight);
        let loss = 0.25 * weight * diff.iter().map(|d| d * d).sum::<f32>();

        Ok((loss, style_grad))
    }

    /// Evaluates the current image of `param` and stores the gradient in it.
    ///
    /// # Returns
    ///
    /// - `Ok(f32)` - The loss of the current image
    /// - `Err(ModelError)` - If the image does not fit the network
    pub fn update(&self, param: &mut ImageParameter) -> Result<f32, ModelError> {
        let (loss, grad) = self.evaluate(param.array())?;
        param.set_grad(grad)?;
        Ok(loss)
    }

    /// The truncated network
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Number of evaluated layers
    pub fn depth(&self) -> usize {
        self.network.len()
    }

    /// Dense content weight of every evaluated layer, already scaled by the subject ratio
    pub fn subject_weights(&self) -> &[f32] {
        &self.subject_weights
    }

    /// Dense style weight of every evaluated layer
    pub fn style_weights(&self) -> &[f32] {
        &self.style_weights
    }

    /// Subject activations, `Some` at every layer with a positive content weight
    pub fn subject_feats(&self) -> &[Option<Tensor>] {
        &self.subject_feats
    }

    /// Rescaled style Gram matrices, `Some` at every layer with a positive style weight
    pub fn style_grams(&self) -> &[Option<Array2<f32>>] {
        &self.style_grams
    }

    /// Coefficient of the smoothness term
    pub fn smoothness(&self) -> f32 {
        self.smoothness
    }
}

