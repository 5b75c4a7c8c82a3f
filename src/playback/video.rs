//! Video presentation through an external player.
//!
//! egui cannot decode video, so [`ExternalPlayer`] materializes the fetched
//! [`VideoBlob`] into a temporary file and launches the configured player
//! (`ffplay` by default) on it.  The file lives as long as the surface holds
//! the blob and is removed when it is replaced or the surface drops.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::PlaybackConfig;
use crate::genai::VideoBlob;

// ---------------------------------------------------------------------------
// VideoError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("no video loaded")]
    NotLoaded,

    #[error("failed to write video to a temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to launch video player `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// VideoSurface trait
// ---------------------------------------------------------------------------

/// Something that can present a video blob.
pub trait VideoSurface: Send + Sync {
    /// Replace the current source with `video`.
    fn load(&self, video: &VideoBlob) -> Result<(), VideoError>;

    /// Whether a source is loaded.
    fn is_loaded(&self) -> bool;

    /// Reset the playback position to the first frame.
    fn seek_to_start(&self);

    /// Start (or resume) playback.
    fn play(&self) -> Result<(), VideoError>;

    /// Stop playback.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// ExternalPlayer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PlayerInner {
    file: Option<NamedTempFile>,
    child: Option<Child>,
}

impl PlayerInner {
    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// A child that has already exited counts as stopped.
    fn is_playing(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(_) => {
                self.child = None;
                false
            }
            None => false,
        }
    }
}

/// [`VideoSurface`] that hands a temporary file to an external program.
pub struct ExternalPlayer {
    command: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    inner: Mutex<PlayerInner>,
}

impl ExternalPlayer {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            command: config.player_command.clone(),
            args: config.player_args.clone(),
            dir: config.video_dir.clone(),
            inner: Mutex::new(PlayerInner::default()),
        }
    }
}

impl VideoSurface for ExternalPlayer {
    /// The previous source is released before the new one is written, so a
    /// failed load leaves the surface empty.
    fn load(&self, video: &VideoBlob) -> Result<(), VideoError> {
        let mut inner = self.inner.lock().unwrap();
        inner.kill_child();
        inner.file = None;

        let suffix = format!(".{}", video.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("productv-").suffix(&suffix);
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(VideoError::TempFile)?;
        file.write_all(video.bytes()).map_err(VideoError::TempFile)?;
        file.flush().map_err(VideoError::TempFile)?;

        log::debug!("video: loaded {} bytes into {}", video.len(), file.path().display());
        inner.file = Some(file);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.inner.lock().unwrap().file.is_some()
    }

    /// An external player always starts from the first frame, so seeking
    /// means ending the current instance.
    fn seek_to_start(&self) {
        self.inner.lock().unwrap().kill_child();
    }

    fn play(&self) -> Result<(), VideoError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.is_playing() {
            return Ok(());
        }
        let path = inner
            .file
            .as_ref()
            .map(|f| f.path().to_path_buf())
            .ok_or(VideoError::NotLoaded)?;

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| VideoError::Launch {
                command: self.command.clone(),
                source,
            })?;

        log::info!("video: `{}` started (pid {})", self.command, child.id());
        inner.child = Some(child);
        Ok(())
    }

    fn stop(&self) {
        self.inner.lock().unwrap().kill_child();
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            inner.kill_child();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(command: &str) -> ExternalPlayer {
        ExternalPlayer::from_config(&PlaybackConfig {
            player_command: command.into(),
            player_args: Vec::new(),
            ..PlaybackConfig::default()
        })
    }

    fn blob() -> VideoBlob {
        VideoBlob::new(b"not really mp4".to_vec(), "video/mp4")
    }

    #[test]
    fn play_before_load_is_not_loaded() {
        let p = player("true");
        assert!(!p.is_loaded());
        assert!(matches!(p.play(), Err(VideoError::NotLoaded)));
    }

    #[test]
    fn load_writes_blob_to_temp_file() {
        let p = player("true");
        p.load(&blob()).unwrap();
        assert!(p.is_loaded());

        let inner = p.inner.lock().unwrap();
        let path = inner.file.as_ref().unwrap().path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_eq!(std::fs::read(path).unwrap(), b"not really mp4");
    }

    #[test]
    fn reload_removes_previous_file() {
        let p = player("true");
        p.load(&blob()).unwrap();
        let first = p.inner.lock().unwrap().file.as_ref().unwrap().path().to_path_buf();

        p.load(&VideoBlob::new(b"second".to_vec(), "video/webm")).unwrap();
        assert!(!first.exists());
    }

    #[test]
    fn failed_reload_leaves_surface_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = player("true");
        p.dir = Some(dir.path().to_path_buf());
        p.load(&blob()).unwrap();
        assert!(p.is_loaded());

        p.dir = Some(dir.path().join("missing"));
        let err = p.load(&VideoBlob::new(b"second".to_vec(), "video/mp4"));
        assert!(matches!(err, Err(VideoError::TempFile(_))));
        assert!(!p.is_loaded());
        assert!(matches!(p.play(), Err(VideoError::NotLoaded)));
    }

    #[test]
    fn missing_player_is_launch_error() {
        let p = player("definitely-not-a-video-player-binary");
        p.load(&blob()).unwrap();
        assert!(matches!(p.play(), Err(VideoError::Launch { .. })));
    }

    #[test]
    fn surface_is_object_safe() {
        let _: Box<dyn VideoSurface> = Box::new(player("true"));
    }
}
