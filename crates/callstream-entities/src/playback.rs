//! Recorded call playback
//!
//! The persistence collaborator materializes recordings under the
//! configured repository; this module exposes them. A recording is named
//! by the MD5 hex of `voice_<db_id>_<call_id>_<session>` — an obfuscated
//! handle, not a capability token. Stopping a playback removes the
//! materialized file again.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use callstream_config::CfgPlayer;

use crate::control::{ControlReply, PlayCallRequest};

/// Obfuscated recording name for a (db_id, call_id, session) triple
pub fn hashed_recording_name(db_id: u32, call_id: u32, session: &str) -> String {
    let stem = format!("voice_{}_{}_{}", db_id, call_id, session);
    format!("{:x}", md5::compute(stem.as_bytes()))
}

/// A spawned external player process. The player convention is mplayer's:
/// it quits on a `q` on stdin.
pub struct PlayerHandle {
    child: Child,
}

impl PlayerHandle {
    /// Start `command` (whitespace-separated program and arguments) with
    /// the recording path appended as the final argument
    pub fn spawn(command: &str, recording: &Path) -> io::Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty player command"))?;

        let child = Command::new(program)
            .args(parts)
            .arg(recording)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child })
    }

    /// Ask the player to quit by flushing a `q` line into its stdin
    pub fn stop(&mut self) -> io::Result<()> {
        match self.child.stdin.as_mut() {
            Some(stdin) => {
                stdin.write_all(b"q\n")?;
                stdin.flush()
            }
            None => Ok(()),
        }
    }

    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait()
    }

    /// Non-blocking check whether the player exited on its own
    pub fn try_finished(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

/// Handles the two playback commands proxied through the control API
pub struct PlaybackManager {
    cfg: CfgPlayer,
    /// Running players keyed by the hashed recording name
    players: HashMap<String, PlayerHandle>,
}

impl PlaybackManager {
    pub fn new(cfg: CfgPlayer) -> Self {
        Self {
            cfg,
            players: HashMap::new(),
        }
    }

    fn recording_path(&self, hashed: &str, format: &str) -> PathBuf {
        Path::new(&self.cfg.voicerec_repo).join(format!("{}.{}", hashed, format))
    }

    pub fn start_play(&mut self, request: &PlayCallRequest) -> ControlReply {
        let hashed = hashed_recording_name(request.db_id, request.call_id, &request.session);
        let path = self.recording_path(&hashed, &request.format);

        if !path.is_file() {
            tracing::error!("recording {} missing for call <{}>", path.display(), request.call_id);
            return ControlReply::nok(format!("Call <{}> not found", request.call_id));
        }

        if !self.cfg.command_template.is_empty() && !self.players.contains_key(&hashed) {
            match PlayerHandle::spawn(&self.cfg.command_template, &path) {
                Ok(handle) => {
                    tracing::info!("player started for {}", path.display());
                    self.players.insert(hashed.clone(), handle);
                }
                Err(e) => {
                    tracing::error!("player spawn failed: {}", e);
                    return ControlReply::nok("Player unavailable");
                }
            }
        }

        ControlReply::ok(format!("/{}/{}.{}", self.cfg.voicerec_url, hashed, request.format))
    }

    pub fn stop_play(&mut self, request: &PlayCallRequest) -> ControlReply {
        let hashed = hashed_recording_name(request.db_id, request.call_id, &request.session);
        let path = self.recording_path(&hashed, &request.format);

        if let Some(mut handle) = self.players.remove(&hashed) {
            if let Err(e) = handle.stop() {
                tracing::warn!("player stop failed: {}", e);
            }
            match handle.wait() {
                Ok(status) => tracing::debug!("player exited: {}", status),
                Err(e) => tracing::warn!("player wait failed: {}", e),
            }
        }

        tracing::debug!("removing recording {}", path.display());
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!("remove of {} failed: {}", path.display(), e);
        }

        ControlReply::from_parts(vec!["OK".to_string(), "OK".to_string()])
    }

    /// Reap players that finished on their own, forgetting their handles
    pub fn reap_finished(&mut self) {
        self.players.retain(|hashed, handle| {
            let finished = handle.try_finished();
            if finished {
                tracing::debug!("player for {} finished", hashed);
            }
            !finished
        });
    }

    pub fn active_players(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_recording_name_is_stable() {
        // md5("voice_17_4242_f00dcafe")
        let hashed = hashed_recording_name(17, 4242, "f00dcafe");
        assert_eq!(hashed.len(), 32);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, format!("{:x}", md5::compute(b"voice_17_4242_f00dcafe")));
    }

    #[test]
    fn test_start_play_missing_recording() {
        let mut manager = PlaybackManager::new(CfgPlayer {
            command_template: String::new(),
            voicerec_repo: "/nonexistent".to_string(),
            voicerec_url: "voicerec".to_string(),
        });
        let request = PlayCallRequest {
            db_id: 1,
            call_id: 2,
            call_type: "G".to_string(),
            format: "wav".to_string(),
            session: "s".to_string(),
        };
        let reply = manager.start_play(&request);
        assert!(!reply.is_ok());
        assert!(reply.to_line().contains("not found"));
    }

    #[test]
    fn test_start_and_stop_play_with_repo_file() {
        let repo = std::env::temp_dir().join("csserver-playback-test");
        std::fs::create_dir_all(&repo).unwrap();

        let request = PlayCallRequest {
            db_id: 5,
            call_id: 6,
            call_type: "I".to_string(),
            format: "wav".to_string(),
            session: "abc".to_string(),
        };
        let hashed = hashed_recording_name(5, 6, "abc");
        let file = repo.join(format!("{}.wav", hashed));
        std::fs::write(&file, b"RIFF").unwrap();

        let mut manager = PlaybackManager::new(CfgPlayer {
            command_template: String::new(), // no player process in tests
            voicerec_repo: repo.to_string_lossy().into_owned(),
            voicerec_url: "voicerec".to_string(),
        });

        let reply = manager.start_play(&request);
        assert!(reply.is_ok());
        assert_eq!(reply.to_line(), format!("OK /voicerec/{}.wav", hashed));

        let reply = manager.stop_play(&request);
        assert!(reply.is_ok());
        assert!(!file.exists());
    }
}
