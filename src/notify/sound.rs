use std::process::Stdio;
use tokio::process::Command;

/// Fire the audio cue through an external player. Playback is not
/// awaited; a spawn failure is logged and nothing else happens.
pub fn play(sound_path: &str) {
    let result = Command::new("cvlc")
        .arg("--play-and-exit")
        .arg("--gain")
        .arg("0.1")
        .arg(sound_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(err) = result {
        tracing::error!("❌ Failed to play notification sound: {}", err);
    }
}
