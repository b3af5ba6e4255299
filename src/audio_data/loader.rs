use crate::audio_data::{LoadOptions, PetalSfxAudioData};
use crate::error::Result;
use std::sync::Arc;

/// Trait for decoding audio files into PCM.
///
/// Loaders run on the engine's background decode thread, hence the `Send + Sync` bound.
/// PetalSfx ships [`DefaultAudioLoader`](super::DefaultAudioLoader) built on Symphonia;
/// implement this trait to decode from packed archives, embedded assets and the like.
///
/// # Example
///
/// ```ignore
/// use petalsfx::audio_data::{AudioDataLoader, LoadOptions, PetalSfxAudioData};
/// use petalsfx::error::Result;
/// use std::sync::Arc;
///
/// struct SilenceLoader;
///
/// impl AudioDataLoader for SilenceLoader {
///     fn load(&self, _path: &str, _options: &LoadOptions) -> Result<Arc<PetalSfxAudioData>> {
///         Ok(Arc::new(PetalSfxAudioData::from_samples(vec![0.0; 4800], 48000, 1)?))
///     }
/// }
/// ```
pub trait AudioDataLoader: Send + Sync {
    /// Decodes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `PetalSfxError` if the file cannot be opened or decoded.
    fn load(&self, path: &str, options: &LoadOptions) -> Result<Arc<PetalSfxAudioData>>;
}
