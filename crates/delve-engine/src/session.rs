//! One run of the game from the command line.
//!
//! A session opens the save file the way the start mode asks, builds the
//! [`Game`], and then drives it: replayed actions are paced out, the
//! player's turns are read from standard input, and the player's narration
//! is echoed as it appears.

use std::path::Path;
use std::time::Duration;

use delve_core::{AdvanceOutcome, Game, SimulationConfig};
use delve_events::{Header, ReplayLog, SaveMode, Script, format_action, parse_action};
use delve_world::{Narration, World};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

use crate::cli::StartMode;
use crate::error::EngineError;

/// Name used in diagnostics for typed actions.
const STDIN_NAME: &str = "<stdin>";

/// How a session presents itself.
#[derive(Debug, Clone, Copy)]
pub struct Presentation {
    /// Never prompt; stop at the first turn that needs input.
    pub headless: bool,
    /// Echo the player's narration to stderr instead of stdout.
    pub diagnostics: bool,
    /// Pause between replayed actions.
    pub replay_delay: Duration,
}

impl Presentation {
    /// Pacing from the frame count and frame length.
    pub fn new(headless: bool, diagnostics: bool, delay_frames: u32, frame_ms: u64) -> Self {
        Self {
            headless,
            diagnostics,
            replay_delay: Duration::from_millis(frame_ms.saturating_mul(u64::from(delay_frames))),
        }
    }
}

/// Open the save file for the chosen start mode.
pub fn open_log(
    mode: StartMode,
    path: &Path,
    snapshot_interval: u32,
) -> Result<ReplayLog, EngineError> {
    let log = match mode {
        StartMode::New => ReplayLog::create(path, Header::Seed(rand::random()), snapshot_interval)?,
        StartMode::NewTest => ReplayLog::create(path, Header::Test, snapshot_interval)?,
        StartMode::Replay => {
            if !path.exists() {
                return Err(EngineError::MissingSave {
                    path: path.to_path_buf(),
                });
            }
            ReplayLog::open(path, SaveMode::Read, snapshot_interval)?
        }
        StartMode::Resume => {
            ReplayLog::resume_or_create(path, Header::Seed(rand::random()), snapshot_interval)?
        }
        StartMode::NoSave => ReplayLog::disabled(Header::Seed(rand::random())),
    };
    Ok(log)
}

/// Play until the player dies, the input runs out, or a headless replay
/// reaches the end of its save file.
pub async fn play(
    log: ReplayLog,
    config: SimulationConfig,
    presentation: Presentation,
) -> Result<(), EngineError> {
    let mut game = Game::new(log, config)?;
    let mut narration = NarrationCursor::default();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    narration.echo(game.world(), presentation);

    loop {
        match game.advance()? {
            AdvanceOutcome::Replayed { actor, action } => {
                debug!(?actor, action = %format_action(&action), time = game.world().time(), "Replayed");
                narration.echo(game.world(), presentation);
                if !presentation.replay_delay.is_zero() {
                    tokio::time::sleep(presentation.replay_delay).await;
                }
            }
            AdvanceOutcome::NeedsDecision { actor } => {
                narration.echo(game.world(), presentation);
                if presentation.headless {
                    info!(time = game.world().time(), "Save file exhausted");
                    break;
                }
                debug!(?actor, "Waiting for input");
                if !read_player_action(&mut game, &mut input).await? {
                    info!("Input closed");
                    break;
                }
            }
            AdvanceOutcome::PlayerDied => {
                narration.echo(game.world(), presentation);
                break;
            }
        }
    }

    game.finish()?;
    info!(
        time = game.world().time(),
        things = game.world().thing_count(),
        over = game.is_over(),
        "Session ended"
    );
    Ok(())
}

/// Read lines until one holds an action and queue it. Returns false once
/// the input is closed.
async fn read_player_action(
    game: &mut Game,
    input: &mut Lines<BufReader<Stdin>>,
) -> Result<bool, EngineError> {
    while let Some(text) = input.next_line().await? {
        let mut script = match Script::parse(STDIN_NAME, &text) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let line = match script.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match parse_action(&line) {
            Ok(action) => {
                game.human_mut().push(action);
                return Ok(true);
            }
            Err(diagnostic) => {
                warn!(input = %text, "Unrecognized action");
                eprintln!("{}", script.error(&line, diagnostic));
            }
        }
    }
    Ok(false)
}

/// Where the player's narration was last echoed up to.
#[derive(Debug, Default)]
struct NarrationCursor {
    mark: u64,
}

impl NarrationCursor {
    /// Print the player's new sentences and move the mark past them.
    fn echo(&mut self, world: &World, presentation: Presentation) {
        let Some(life) = world
            .you()
            .and_then(|you| world.get(you))
            .and_then(|thing| thing.life())
        else {
            return;
        };
        let narration = &life.knowledge.narration;
        if !presentation.headless || presentation.diagnostics {
            for entry in narration.since(self.mark) {
                let text = match entry {
                    Narration::Sentence(text) => text.as_str(),
                    Narration::Separator => "--",
                };
                if presentation.diagnostics {
                    eprintln!("{text}");
                } else {
                    println!("{text}");
                }
            }
        }
        self.mark = narration.total();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_save(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("delve-{}-{name}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn replaying_a_missing_save_is_an_error() {
        let path = temp_save("missing.save");
        let err = open_log(StartMode::Replay, &path, 0).unwrap_err();
        assert!(matches!(err, EngineError::MissingSave { .. }));
    }

    #[test]
    fn new_test_games_record_the_test_header() {
        let path = temp_save("new-test.save");
        let log = open_log(StartMode::NewTest, &path, 0).unwrap();
        assert_eq!(log.header(), Header::Test);
        assert_eq!(log.mode(), SaveMode::Write);
        drop(log);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("@test"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn resuming_without_a_save_starts_recording() {
        let path = temp_save("resume.save");
        let log = open_log(StartMode::Resume, &path, 0).unwrap();
        assert_eq!(log.mode(), SaveMode::Write);
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unsaved_games_touch_no_files() {
        let log = open_log(StartMode::NoSave, Path::new("never-written.save"), 0).unwrap();
        assert_eq!(log.mode(), SaveMode::Ignore);
        assert!(!Path::new("never-written.save").exists());
    }

    #[test]
    fn delay_is_frames_times_frame_length() {
        let presentation = Presentation::new(true, false, 3, 16);
        assert_eq!(presentation.replay_delay, Duration::from_millis(48));
    }

    #[tokio::test]
    async fn headless_replays_stop_at_the_end_of_the_save() {
        let path = temp_save("headless.save");
        std::fs::write(&path, "@test\nmove 1 0\nmove 1 0\n").unwrap();
        let before = std::fs::read(&path).unwrap();
        let log = open_log(StartMode::Replay, &path, 0).unwrap();
        let presentation = Presentation::new(true, false, 0, 16);
        play(log, SimulationConfig::default(), presentation)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let log = open_log(StartMode::Replay, &path, 0).unwrap();
        play(log, SimulationConfig::default(), presentation)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
        std::fs::remove_file(&path).unwrap();
    }
}
