pub mod chime;

use chime::Chime;

use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use crate::error::NotificationError;
use crate::notify::{AlertKind, AlertPlayer};

enum AudioCommand {
    Play(AlertKind),
    Stop,
}

/// Plays phase-end chimes on the default output device.
///
/// rodio's output stream is not `Send`, so it lives on a dedicated thread that
/// is started on first use and fed through a channel.
pub struct ChimePlayer {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl ChimePlayer {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, NotificationError> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|e| NotificationError::Failed(e.to_string()))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        thread::Builder::new()
            .name("study-guardian-audio".to_string())
            .spawn(move || {
                let (_stream, sink) = match OutputStream::try_default()
                    .map_err(|e| format!("Failed to create audio output stream: {e}"))
                    .and_then(|(stream, handle)| {
                        Sink::try_new(&handle)
                            .map(|sink| (stream, sink))
                            .map_err(|e| format!("Failed to create audio sink: {e}"))
                    }) {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play(kind) => {
                            // A newer chime replaces one still ringing.
                            sink.clear();
                            sink.append(Chime::for_alert(kind));
                            sink.play();
                        }
                        AudioCommand::Stop => sink.clear(),
                    }
                }
            })
            .map_err(|e| NotificationError::Unavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| NotificationError::Unavailable("audio thread exited".into()))?
            .map_err(NotificationError::Unavailable)?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

}

impl Default for ChimePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertPlayer for ChimePlayer {
    fn play_alert(&self, kind: AlertKind) -> Result<(), NotificationError> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Play(kind))
            .map_err(|e| NotificationError::Failed(e.to_string()))
    }

    fn stop(&self) {
        // Nothing to silence if the audio thread never started.
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }
}
