use crate::error::{IoError, ModelError, StyleError};
use crate::neural_network::{Adam, Architecture, Network, Optimizer, PretrainedWeights, SGD};
use crate::style_transfer::config::{OptimizerKind, StyleConfig};
use crate::style_transfer::image_parameter::{ImageParameter, initial_image};
use crate::style_transfer::preprocess::Preprocessor;
use crate::style_transfer::style_network::StyleNetwork;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use std::path::Path;

/// Result of an optimization run.
///
/// # Fields
///
/// - `image` - The synthesized image
/// - `losses` - Loss of the image before each optimizer step
#[derive(Debug, Clone)]
pub struct StyleOutput {
    pub image: RgbImage,
    pub losses: Vec<f32>,
}

/// Drives a complete style transfer from a [`StyleConfig`].
///
/// [`StyleTransfer::run`] reads the network and both images from disk and
/// writes the result to `config.output`. [`StyleTransfer::run_with_network`]
/// starts from an already instantiated network and images in memory.
pub struct StyleTransfer {
    config: StyleConfig,
}

impl StyleTransfer {
    /// Creates a driver for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigurationError` if a run parameter is invalid.
    pub fn new(config: StyleConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(StyleTransfer { config })
    }

    /// Returns the configuration
    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// Loads the architecture named by the configuration, or the built-in VGG-19 table.
    pub fn load_architecture(&self) -> Result<Architecture, StyleError> {
        let architecture = match &self.config.network {
            Some(path) => Architecture::from_path(path)?,
            None => Architecture::vgg19(self.config.pooling),
        };
        Ok(architecture.with_pooling(self.config.pooling))
    }

    /// Runs the whole transfer and saves the result.
    ///
    /// # Returns
    ///
    /// - `Ok(StyleOutput)` - The synthesized image and the loss history
    /// - `Err(StyleError::Io)` - A file could not be read or written
    /// - `Err(StyleError::Model)` - The network or the configuration was rejected
    pub fn run(&self) -> Result<StyleOutput, StyleError> {
        let architecture = self.load_architecture()?;
        let weights = PretrainedWeights::from_path(&self.config.weights)?;
        let network = Network::from_pretrained(&architecture, &weights)?;
        info!(
            "loaded '{}' with {} feature layers and {} parameters",
            network.name(),
            network.len(),
            network.param_count()
        );

        let subject = load_image(&self.config.subject)?;
        let style = load_image(&self.config.style)?;

        let output = self.run_with_network(network, &architecture, &subject, &style)?;

        output
            .image
            .save(&self.config.output)
            .map_err(IoError::ImageError)?;
        info!("wrote {}", self.config.output);

        Ok(output)
    }

    /// Optimizes an image for an instantiated network.
    ///
    /// # Parameters
    ///
    /// - `network` - Feature layers of the pretrained network
    /// - `architecture` - Supplies the block names and the preprocessing
    /// - `subject` - Image whose content is kept
    /// - `style` - Image whose texture is transferred
    ///
    /// # Returns
    ///
    /// - `Ok(StyleOutput)` - The synthesized image and the loss history
    /// - `Err(StyleError)` - If the configuration does not fit the network or a frame can't be written
    pub fn run_with_network(
        &self,
        network: Network,
        architecture: &Architecture,
        subject: &RgbImage,
        style: &RgbImage,
    ) -> Result<StyleOutput, StyleError> {
        let config = &self.config;
        let preprocessor = Preprocessor::from_architecture(architecture)?;
        let (subject_weights, style_weights) = config.block_weights(architecture)?;

        let subject_tensor = preprocessor.to_tensor(subject);
        let style_tensor = preprocessor.to_tensor(style);

        let style_network = StyleNetwork::new(
            network,
            &subject_tensor,
            &style_tensor,
            &subject_weights,
            &style_weights,
            config.subject_ratio,
            config.smoothness,
        )?;

        let init = initial_image(&subject_tensor, config.init_noise, config.seed)?;
        let mut param = ImageParameter::new(init)?;
        let mut optimizer = self.build_optimizer()?;

        if let Some(dir) = &config.animation_dir {
            std::fs::create_dir_all(dir).map_err(IoError::StdIoError)?;
        }

        info!(
            "optimizing a {}x{} image for {} iterations",
            subject.width(),
            subject.height(),
            config.iterations
        );

        let progress_bar = ProgressBar::new(config.iterations as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Loss: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let mut losses = Vec::with_capacity(config.iterations);
        for iteration in 0..config.iterations {
            if let Some(dir) = &config.animation_dir {
                if iteration % config.animation_rate == 0 {
                    let frame = preprocessor.to_image(param.array())?;
                    let path = Path::new(dir).join(format!("{:04}.png", iteration));
                    frame.save(&path).map_err(IoError::ImageError)?;
                }
            }

            let loss = style_network.update(&mut param)?;
            param.apply(optimizer.as_mut())?;

            debug!("iteration {} loss {}", iteration, loss);
            progress_bar.set_message(format!("{:.6}", loss));
            progress_bar.inc(1);
            losses.push(loss);
        }
        progress_bar.finish_with_message("Optimization completed");

        if let Some(&loss) = losses.last() {
            info!("final loss {}", loss);
        }

        let image = preprocessor.to_image(param.array())?;
        Ok(StyleOutput { image, losses })
    }

    fn build_optimizer(&self) -> Result<Box<dyn Optimizer>, ModelError> {
        let lr = self.config.learning_rate;
        Ok(match self.config.optimizer {
            OptimizerKind::Adam => Box::new(Adam::new(lr, 0.9, 0.999, 1e-8)?),
            OptimizerKind::Sgd => Box::new(SGD::new(lr)?),
        })
    }
}

/// Reads an image file as 8-bit RGB.
pub fn load_image(path: &str) -> Result<RgbImage, IoError> {
    let image = image::open(path).map_err(IoError::ImageError)?;
    Ok(image.to_rgb8())
}
