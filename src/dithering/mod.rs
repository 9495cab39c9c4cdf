//! Black/white quantization engines and the per-channel dispatcher that
//! feeds them.

pub mod diffusion;
pub mod dispatch;
pub mod ordered;
pub mod quantize;
pub mod random;

pub use diffusion::{DiffusionKernel, ErrorBuffer, ATKINSON, FLOYD_STEINBERG, JARVIS_JUDICE_NINKE};
pub use dispatch::{Algorithm, ChannelDispatcher};
pub use ordered::BayerMatrix;
pub use random::RandomThreshold;
