// src/util/audio/mod.rs
use rodio::{Decoder, OutputStream, Sink, Source};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::error::SideEffectError;
use crate::modules::alert::collaborators::SoundPlayer;
use crate::{log_debug, log_error};

pub trait AudioBackend {
    fn play(&mut self, path: &Path, repeat: bool) -> Result<(), String>;
    fn stop(&mut self, path: &Path);
}

#[derive(Default)]
struct SinkTable {
    sinks: HashMap<PathBuf, Arc<Sink>>,
    // Bumped by every stop; a playback thread that started before the bump
    // must not register its sink.
    epoch: u64,
}

struct AudioJackPlayer {
    volume: f32,
    active: Arc<Mutex<SinkTable>>,
}

impl AudioJackPlayer {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            active: Arc::new(Mutex::new(SinkTable::default())),
        }
    }
}

impl AudioBackend for AudioJackPlayer {
    fn play(&mut self, path: &Path, repeat: bool) -> Result<(), String> {
        if !path.exists() {
            return Err(format!("alarm sound {} not found", path.display()));
        }

        let path = path.to_path_buf();
        let volume = self.volume;
        let table = Arc::clone(&self.active);

        // Kill prior play of same path
        let epoch = {
            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(old) = table.sinks.remove(&path) {
                old.stop();
            }
            table.epoch
        };

        thread::spawn(move || {
            // Create OutputStream inside the thread to avoid Send issues on macOS
            let (_stream, handle) = match OutputStream::try_default() {
                Ok(v) => v,
                Err(e) => {
                    log_error!("Failed to create audio stream: {}", e);
                    return;
                }
            };

            let sink = match Sink::try_new(&handle) {
                Ok(s) => s,
                Err(e) => {
                    log_error!("Failed to create sink: {}", e);
                    return;
                }
            };

            sink.set_volume(volume);

            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    log_error!("Failed to open audio file {}: {}", path.display(), e);
                    return;
                }
            };

            let source = match Decoder::new(BufReader::new(file)) {
                Ok(s) => s,
                Err(e) => {
                    log_error!("Failed to decode audio file {}: {}", path.display(), e);
                    return;
                }
            };

            let sink = Arc::new(sink);
            {
                let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
                if table.epoch != epoch {
                    log_debug!("Alarm stopped before playback began");
                    return;
                }
                if repeat {
                    sink.append(source.repeat_infinite());
                } else {
                    sink.append(source);
                }
                table.sinks.insert(path.clone(), Arc::clone(&sink));
            }

            sink.sleep_until_end();

            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.sinks.get(&path).is_some_and(|current| Arc::ptr_eq(current, &sink)) {
                table.sinks.remove(&path);
            }
        });

        Ok(())
    }

    fn stop(&mut self, path: &Path) {
        let mut table = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        table.epoch += 1;
        if let Some(sink) = table.sinks.remove(path) {
            sink.stop();
        }
    }
}

/// No audio device configured.
struct SilentPlayer;

impl AudioBackend for SilentPlayer {
    fn play(&mut self, _: &Path, _: bool) -> Result<(), String> {
        log_debug!("No alarm sound configured, alarm is silent");
        Ok(())
    }
    fn stop(&mut self, _: &Path) {}
}

/// Looping alarm sound.
#[derive(Clone)]
pub struct AlarmSound {
    inner: Arc<Mutex<dyn AudioBackend + Send>>,
    path: PathBuf,
}

impl std::fmt::Debug for AlarmSound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmSound")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl AlarmSound {
    pub fn new_with_audio_jack(path: &Path, volume: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AudioJackPlayer::new(volume))),
            path: path.to_path_buf(),
        }
    }

    pub fn silent() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SilentPlayer)),
            path: PathBuf::new(),
        }
    }

    /// Audio jack player when a sound file is configured, silent otherwise.
    pub fn from_config(path: Option<&Path>, volume: f32) -> Self {
        match path {
            Some(path) => Self::new_with_audio_jack(path, volume),
            None => Self::silent(),
        }
    }
}

impl SoundPlayer for AlarmSound {
    fn start(&mut self) -> Result<(), SideEffectError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .play(&self.path, true)
            .map_err(SideEffectError::Sound)
    }

    fn stop(&mut self) -> Result<(), SideEffectError> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).stop(&self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sound_file_is_a_side_effect_error() {
        let mut sound = AlarmSound::new_with_audio_jack(Path::new("/nonexistent/alert.mp3"), 1.0);

        assert!(matches!(sound.start(), Err(SideEffectError::Sound(_))));
        assert!(sound.stop().is_ok());
    }

    #[test]
    fn test_silent_player_starts_and_stops_quietly() {
        let mut sound = AlarmSound::silent();

        assert!(sound.start().is_ok());
        assert!(sound.stop().is_ok());
        assert!(sound.stop().is_ok());
    }
}
