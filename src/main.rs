//! rustystyle - paint the content of one image in the style of another
//!
//! # Usage
//!
//! ```bash
//! rustystyle --subject photo.jpg --style painting.jpg --weights vgg19.json --output out.png
//!
//! # deeper content layer, fewer iterations, an animation frame every 10 steps
//! rustystyle --subject photo.jpg --style painting.jpg --weights vgg19.json \
//!   --subject-weights conv5_2=1 --iterations 200 --animation-dir frames --animation-rate 10
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rustystyle::neural_network::PoolingMethod;
use rustystyle::style_transfer::{OptimizerKind, StyleConfig, StyleTransfer};

/// Neural artistic style transfer
#[derive(Parser)]
#[command(name = "rustystyle", version, about)]
struct Cli {
    /// JSON run configuration; command line options override its fields
    #[arg(long)]
    config: Option<String>,

    /// Image whose content is kept
    #[arg(long)]
    subject: Option<String>,

    /// Image whose texture is transferred
    #[arg(long)]
    style: Option<String>,

    /// Where the result is written
    #[arg(short, long)]
    output: Option<String>,

    /// JSON architecture description (default: built-in VGG-19)
    #[arg(long)]
    network: Option<String>,

    /// JSON file with the pretrained convolution filters
    #[arg(long)]
    weights: Option<String>,

    /// Pooling method: max or avg
    #[arg(long)]
    pooling: Option<PoolingMethod>,

    /// Content weights as block=weight, e.g. conv4_2=1
    #[arg(long, num_args = 1..)]
    subject_weights: Option<Vec<String>>,

    /// Style weights as block=weight, e.g. conv1_1=1 conv2_1=1
    #[arg(long, num_args = 1..)]
    style_weights: Option<Vec<String>>,

    /// Balance of content against style
    #[arg(long)]
    subject_ratio: Option<f32>,

    /// Share of Gaussian noise in the initial image, in [0, 1]
    #[arg(long)]
    init_noise: Option<f32>,

    /// Seed of the initial noise
    #[arg(long)]
    seed: Option<u64>,

    /// Coefficient of the smoothness term
    #[arg(long)]
    smoothness: Option<f32>,

    /// Update rule: adam or sgd
    #[arg(long)]
    optimizer: Option<OptimizerKind>,

    #[arg(long)]
    learning_rate: Option<f32>,

    #[arg(short, long)]
    iterations: Option<usize>,

    /// Directory receiving intermediate images
    #[arg(long)]
    animation_dir: Option<String>,

    /// Iterations between two intermediate images
    #[arg(long)]
    animation_rate: Option<usize>,
}

impl Cli {
    fn into_config(self) -> Result<StyleConfig> {
        let mut config = match &self.config {
            Some(path) => StyleConfig::from_path(path)
                .with_context(|| format!("failed to read configuration {}", path))?,
            None => StyleConfig::default(),
        };

        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        apply!(
            subject,
            style,
            output,
            weights,
            pooling,
            subject_weights,
            style_weights,
            subject_ratio,
            init_noise,
            seed,
            smoothness,
            optimizer,
            learning_rate,
            iterations,
            animation_rate
        );
        if self.network.is_some() {
            config.network = self.network;
        }
        if self.animation_dir.is_some() {
            config.animation_dir = self.animation_dir;
        }

        if config.subject.is_empty() || config.style.is_empty() {
            anyhow::bail!("both --subject and --style are required");
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().into_config()?;

    info!("subject {}, style {}", config.subject, config.style);
    let transfer = StyleTransfer::new(config).context("invalid configuration")?;
    let output = transfer.run().context("style transfer failed")?;

    if let Some(loss) = output.losses.last() {
        info!("done, final loss {}", loss);
    }
    Ok(())
}
