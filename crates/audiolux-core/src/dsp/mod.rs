//! DSP front-end: filtering, preprocessing and spectral analysis
//!
//! Everything here runs on the graph thread; state (filter delay lines,
//! decimation phase, FFT plans) is owned by whoever constructs it.

pub mod filter;
pub mod level;
pub mod preprocess;
pub mod smoothing;
pub mod spectrum;

pub use filter::{FilterKind, FilterState};
pub use level::{db_to_index, peak, rms, to_db};
pub use preprocess::{downsample_factor, hann_window, Preprocessor};
pub use smoothing::GaussianKernel;
pub use spectrum::{bark, FrequencyBand, SpectrumAnalyzer};
