use crate::error::IoError;
use crate::neural_network::layer::Conv2D;
use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};

/// Serializable representation of Conv2D layer weights.
///
/// # Fields
///
/// - `weight` - 4D convolution weight tensor \[filters, channels, kernel_height, kernel_width\] stored as nested vectors
/// - `bias` - 2D bias matrix \[1, filters\] stored as nested vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableConv2DWeight {
    pub weight: Vec<Vec<Vec<Vec<f32>>>>,
    pub bias: Vec<Vec<f32>>,
}

impl SerializableConv2DWeight {
    /// Converts a layer's filters into their serializable form.
    pub fn from_layer(layer: &Conv2D) -> Self {
        SerializableConv2DWeight {
            weight: layer
                .get_weights()
                .outer_iter()
                .map(|filter| {
                    filter
                        .outer_iter()
                        .map(|channel| channel.outer_iter().map(|row| row.to_vec()).collect())
                        .collect()
                })
                .collect(),
            bias: layer
                .get_bias()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }

    /// Converts the nested vectors back into arrays.
    ///
    /// # Returns
    ///
    /// - `Ok((Array4<f32>, Array2<f32>))` - Filter weights and bias
    /// - `Err(IoError::StdIoError)` - Ragged nested vectors
    pub fn to_arrays(&self) -> Result<(Array4<f32>, Array2<f32>), IoError> {
        Ok((vec4_to_array4(&self.weight)?, vec2_to_array2(&self.bias)?))
    }
}

/// Pretrained filters of a network, keyed by convolution layer name.
///
/// # Example
/// ```rust
/// use rustystyle::neural_network::PretrainedWeights;
///
/// let json = r#"{ "layers": { "conv1_1": { "weight": [[[[1.0]]]], "bias": [[0.5]] } } }"#;
/// let weights = PretrainedWeights::from_reader(json.as_bytes()).unwrap();
///
/// let (filters, bias) = weights.layers["conv1_1"].to_arrays().unwrap();
/// assert_eq!(filters.shape(), &[1, 1, 1, 1]);
/// assert_eq!(bias[[0, 0]], 0.5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PretrainedWeights {
    pub layers: HashMap<String, SerializableConv2DWeight>,
}

impl PretrainedWeights {
    /// Creates an empty weight set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the filters of `layer` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: &str, layer: &Conv2D) {
        self.layers
            .insert(name.to_string(), SerializableConv2DWeight::from_layer(layer));
    }

    /// Reads a weight set from any JSON reader.
    ///
    /// # Returns
    ///
    /// - `Ok(PretrainedWeights)` - The parsed weights
    /// - `Err(IoError::JsonError)` - Deserialization from JSON failed
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IoError> {
        from_reader(reader).map_err(IoError::JsonError)
    }

    /// Loads a weight set from a JSON file.
    ///
    /// # Parameters
    ///
    /// * `path` - File path of the weights (e.g., "vgg19.json")
    ///
    /// # Returns
    ///
    /// - `Ok(PretrainedWeights)` - The parsed weights
    /// - `Err(IoError::StdIoError)` - File not found or read operation failed
    /// - `Err(IoError::JsonError)` - Deserialization from JSON failed
    pub fn from_path(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        Self::from_reader(reader)
    }

    /// Saves the weight set as JSON.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights successfully saved to file
    /// - `Err(IoError::StdIoError)` - File creation or write operation failed
    /// - `Err(IoError::JsonError)` - Serialization to JSON failed
    pub fn save_to_path(&self, path: &str) -> Result<(), IoError> {
        let file = File::create(path).map_err(IoError::StdIoError)?;
        let mut writer = BufWriter::new(file);

        to_writer(&mut writer, self).map_err(IoError::JsonError)?;

        writer.flush().map_err(IoError::StdIoError)?;

        Ok(())
    }
}

fn invalid_data(message: String) -> IoError {
    IoError::StdIoError(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    ))
}

fn ragged(what: &str, index: &[usize], expected: usize, found: usize) -> IoError {
    invalid_data(format!(
        "ragged {}: entry {:?} has length {}, expected {}",
        what, index, found, expected
    ))
}

fn vec2_to_array2(vec: &[Vec<f32>]) -> Result<Array2<f32>, IoError> {
    let rows = vec.len();
    let cols = vec.first().map_or(0, |row| row.len());
    for (i, row) in vec.iter().enumerate() {
        if row.len() != cols {
            return Err(ragged("bias", &[i], cols, row.len()));
        }
    }
    let flat: Vec<f32> = vec.iter().flat_map(|row| row.iter().cloned()).collect();
    Array2::from_shape_vec((rows, cols), flat).map_err(|e| invalid_data(e.to_string()))
}

fn vec4_to_array4(vec: &[Vec<Vec<Vec<f32>>>]) -> Result<Array4<f32>, IoError> {
    let d0 = vec.len();
    let d1 = vec.first().map_or(0, |v1| v1.len());
    let d2 = vec.first().and_then(|v1| v1.first()).map_or(0, |v2| v2.len());
    let d3 = vec
        .first()
        .and_then(|v1| v1.first())
        .and_then(|v2| v2.first())
        .map_or(0, |v3| v3.len());

    // every level must be rectangular, matching lengths alone can hide a shifted row
    for (i, v1) in vec.iter().enumerate() {
        if v1.len() != d1 {
            return Err(ragged("filters", &[i], d1, v1.len()));
        }
        for (j, v2) in v1.iter().enumerate() {
            if v2.len() != d2 {
                return Err(ragged("filters", &[i, j], d2, v2.len()));
            }
            for (k, v3) in v2.iter().enumerate() {
                if v3.len() != d3 {
                    return Err(ragged("filters", &[i, j, k], d3, v3.len()));
                }
            }
        }
    }

    let flat: Vec<f32> = vec
        .iter()
        .flat_map(|v1| {
            v1.iter()
                .flat_map(|v2| v2.iter().flat_map(|v3| v3.iter().cloned()))
        })
        .collect();
    Array4::from_shape_vec((d0, d1, d2, d3), flat).map_err(|e| invalid_data(e.to_string()))
}
