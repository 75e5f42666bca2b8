pub use crate::error::*;

#[cfg(feature = "neural_network")]
pub use crate::neural_network::*;

#[cfg(feature = "style_transfer")]
pub use crate::style_transfer::*;
