//! The replay log: save file, determinism check, and test-script runner.
//!
//! A save file starts with a header (`@seed <hex32>` or `@test`) followed
//! by the player's accepted actions, one per line. Everything else in the
//! simulation is a function of the seed and those actions, so replaying the
//! file rebuilds the game exactly. Between actions the file may carry
//! snapshot blocks, which are compared against the live world on replay,
//! and test directives, which check what the player knows.
//!
//! In test mode every random draw is written as an `  @rng <value> <tag>`
//! line right after the action that caused it, and replay feeds those values
//! back after checking the tag. Seeded games do not log draws.
//!
//! [`SaveMode`] selects what happens to the file: `Write` records a new
//! game, `Read` replays and then stops recording, `ReadWrite` replays and
//! then continues recording at the end, and `Ignore` does nothing.

use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use delve_types::{Action, Initiative, ThingId};
use delve_world::{RandomError, RandomState, Randomness, SeededRandom, World};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{format_action, hex_u32, is_action_name, parse_action, parse_hex_u32, parse_u64};
use crate::directives::{Expectations, TEST_DIRECTIVES};
use crate::error::{Diagnostic, ReplayError};
use crate::snapshot::{SNAPSHOT_DIRECTIVES, Snapshot};
use crate::token::{Line, Script};

/// What the log does with its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveMode {
    /// Record a new game.
    Write,
    /// Replay, then stop recording at the end of the file.
    Read,
    /// Replay, then keep recording at the end of the file.
    ReadWrite,
    /// Neither read nor write.
    Ignore,
}

/// The first line of every save file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Header {
    /// A normal game from a 32-bit seed.
    Seed(u32),
    /// Deterministic test mode.
    Test,
}

impl Header {
    /// The header line, without the newline.
    pub fn to_line(self) -> String {
        match self {
            Self::Seed(seed) => format!("@seed {}", hex_u32(seed)),
            Self::Test => "@test".to_owned(),
        }
    }

    /// The generator this header calls for.
    pub fn random(self) -> SeededRandom {
        match self {
            Self::Seed(seed) => SeededRandom::new(seed),
            Self::Test => SeededRandom::test_mode(),
        }
    }
}

/// Where recorded lines go.
#[derive(Debug)]
enum Sink {
    /// Nowhere yet; a file is opened on the first write.
    Closed,
    /// An open save file.
    File(File),
    /// An in-memory transcript.
    Memory(Vec<String>),
}

/// The replay/determinism log.
#[derive(Debug)]
pub struct ReplayLog {
    path: String,
    file_path: Option<PathBuf>,
    mode: SaveMode,
    header: Header,
    script: Script,
    sink: Sink,
    rng: SeededRandom,
    expectations: Expectations,
    snapshot_interval: u32,
    recorded_actions: u64,
    last_action_line: usize,
}

fn read_header(script: &mut Script) -> Result<Header, ReplayError> {
    let line = script
        .next_line()?
        .ok_or_else(|| script.locate(1, Diagnostic::line("unexpected EOF")))?;
    let header = match line.keyword() {
        "@test" => line.expect_args(0).map(|_| Header::Test),
        "@seed" => match line.expect_args(1) {
            Ok([seed]) => parse_hex_u32(seed).map(Header::Seed),
            Ok(_) => Err(Diagnostic::line("expected 1 arguments")),
            Err(diagnostic) => Err(diagnostic),
        },
        _ => Err(Diagnostic::line("expected delve header")),
    };
    header.map_err(|diagnostic| script.error(&line, diagnostic))
}

impl ReplayLog {
    fn with_parts(
        path: String,
        file_path: Option<PathBuf>,
        mode: SaveMode,
        header: Header,
        script: Script,
        sink: Sink,
        snapshot_interval: u32,
    ) -> Self {
        Self {
            path,
            file_path,
            mode,
            header,
            script,
            sink,
            rng: header.random(),
            expectations: Expectations::new(),
            snapshot_interval,
            recorded_actions: 0,
            last_action_line: 0,
        }
    }

    /// Start recording a new game into a file, replacing any old one.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] if the file cannot be created.
    pub fn create(path: &Path, header: Header, snapshot_interval: u32) -> Result<Self, ReplayError> {
        let shown = path.display().to_string();
        let file = File::create(path).map_err(|e| ReplayError::io(shown.clone(), e))?;
        let script = Script::parse(shown.clone(), "")?;
        let mut log = Self::with_parts(
            shown,
            Some(path.to_path_buf()),
            SaveMode::Write,
            header,
            script,
            Sink::File(file),
            snapshot_interval,
        );
        log.write_line(&header.to_line())?;
        info!(path = %log.path, ?header, "Recording new game");
        Ok(log)
    }

    /// Open an existing save file for `Read` or `ReadWrite`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] if the file cannot be read, or a parse
    /// error for a bad header.
    pub fn open(path: &Path, mode: SaveMode, snapshot_interval: u32) -> Result<Self, ReplayError> {
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| ReplayError::io(shown.clone(), e))?;
        let mut script = Script::parse(shown.clone(), &text)?;
        let header = read_header(&mut script)?;
        info!(path = %shown, ?header, ?mode, "Opened save file");
        Ok(Self::with_parts(
            shown,
            Some(path.to_path_buf()),
            mode,
            header,
            script,
            Sink::Closed,
            snapshot_interval,
        ))
    }

    /// Resume a save file if it exists, otherwise start a new one.
    ///
    /// # Errors
    ///
    /// As [`ReplayLog::open`] and [`ReplayLog::create`].
    pub fn resume_or_create(
        path: &Path,
        new_header: Header,
        snapshot_interval: u32,
    ) -> Result<Self, ReplayError> {
        if path.exists() {
            Self::open(path, SaveMode::ReadWrite, snapshot_interval)
        } else {
            Self::create(path, new_header, snapshot_interval)
        }
    }

    /// A log that records nothing.
    pub fn disabled(header: Header) -> Self {
        Self::with_parts(
            "<no save>".to_owned(),
            None,
            SaveMode::Ignore,
            header,
            Script::empty("<no save>"),
            Sink::Closed,
            0,
        )
    }

    /// Record a new game into memory.
    pub fn recording(header: Header, snapshot_interval: u32) -> Self {
        Self::with_parts(
            "<memory>".to_owned(),
            None,
            SaveMode::Write,
            header,
            Script::empty("<memory>"),
            Sink::Memory(vec![header.to_line()]),
            snapshot_interval,
        )
    }

    /// Replay script text held in memory. In `ReadWrite` mode, lines
    /// recorded after the end of the script are kept in memory.
    ///
    /// # Errors
    ///
    /// Returns a parse error for a bad header.
    pub fn from_script(name: &str, text: &str, mode: SaveMode) -> Result<Self, ReplayError> {
        let mut script = Script::parse(name, text)?;
        let header = read_header(&mut script)?;
        Ok(Self::with_parts(
            name.to_owned(),
            None,
            mode,
            header,
            script,
            Sink::Memory(Vec::new()),
            0,
        ))
    }

    // ---- state ----

    /// The header the game was started from.
    pub const fn header(&self) -> Header {
        self.header
    }

    /// The current mode.
    pub const fn mode(&self) -> SaveMode {
        self.mode
    }

    /// Whether actions are still being read from the file.
    pub const fn is_replaying(&self) -> bool {
        matches!(self.mode, SaveMode::Read | SaveMode::ReadWrite)
    }

    /// The position of the underlying generator.
    pub const fn random_state(&self) -> RandomState {
        self.rng.state()
    }

    /// Lines recorded into memory, for logs without a file.
    pub fn transcript(&self) -> &[String] {
        match &self.sink {
            Sink::Memory(lines) => lines,
            Sink::Closed | Sink::File(_) => &[],
        }
    }

    // ---- writing ----

    fn write_line(&mut self, line: &str) -> Result<(), ReplayError> {
        if matches!(self.sink, Sink::Closed) {
            let Some(path) = &self.file_path else {
                self.sink = Sink::Memory(Vec::new());
                return self.write_line(line);
            };
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| ReplayError::io(self.path.clone(), e))?;
            self.sink = Sink::File(file);
        }
        match &mut self.sink {
            Sink::File(file) => writeln!(file, "{line}")
                .and_then(|()| file.flush())
                .map_err(|e| ReplayError::io(self.path.clone(), e)),
            Sink::Memory(lines) => {
                lines.push(line.to_owned());
                Ok(())
            }
            Sink::Closed => Ok(()),
        }
    }

    /// Record an accepted action of the player's individual. Outside test
    /// mode a snapshot of the world is written first every
    /// `snapshot_interval` actions. Does nothing unless writing.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] if the file cannot be written.
    pub fn record_action(
        &mut self,
        world: &World,
        actor: ThingId,
        action: &Action,
    ) -> Result<(), ReplayError> {
        if self.mode != SaveMode::Write {
            return Ok(());
        }
        let wants_snapshot = !self.rng.is_test_mode()
            && self.snapshot_interval > 0
            && self
                .recorded_actions
                .checked_rem(u64::from(self.snapshot_interval))
                == Some(0);
        if wants_snapshot {
            let snapshot = Snapshot::capture(world, self.rng.state(), Some(actor));
            for line in snapshot.to_lines() {
                self.write_line(&line)?;
            }
        }
        self.write_line(&format_action(action))?;
        self.recorded_actions = self.recorded_actions.saturating_add(1);
        debug!(action = action.name(), recorded = self.recorded_actions, "Recorded action");
        Ok(())
    }

    /// Delete the save file after the player's death. Only a log that is
    /// writing does this; replays never destroy their input.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Io`] if the file cannot be removed.
    pub fn delete_save_file(&mut self) -> Result<(), ReplayError> {
        if self.mode != SaveMode::Write {
            return Ok(());
        }
        self.mode = SaveMode::Ignore;
        match std::mem::replace(&mut self.sink, Sink::Closed) {
            Sink::File(file) => drop(file),
            Sink::Memory(_) | Sink::Closed => {}
        }
        if let Some(path) = &self.file_path {
            fs::remove_file(path).map_err(|e| ReplayError::io(self.path.clone(), e))?;
            info!(path = %self.path, "Deleted save file");
        }
        Ok(())
    }

    // ---- reading ----

    /// The end of the file was reached: stop reading.
    fn reach_end(&mut self) {
        self.mode = match self.mode {
            SaveMode::ReadWrite => SaveMode::Write,
            SaveMode::Read | SaveMode::Write | SaveMode::Ignore => SaveMode::Ignore,
        };
        info!(path = %self.path, mode = ?self.mode, "Reached end of save file");
    }

    fn located(&self, line: &Line, diagnostic: Diagnostic) -> ReplayError {
        self.script.error(line, diagnostic)
    }

    /// The next recorded action of the player's individual, running any
    /// snapshot checks and test directives that come before it.
    ///
    /// Returns `None` when not replaying, or when the end of the file is
    /// reached (which switches the mode).
    ///
    /// # Errors
    ///
    /// Returns a located parse error, a failed expectation, or
    /// [`ReplayError::CorruptSave`] when a snapshot disagrees.
    pub fn read_action(
        &mut self,
        world: &World,
        actor: ThingId,
    ) -> Result<Option<Action>, ReplayError> {
        while self.is_replaying() {
            let Some(line) = self.script.next_line()? else {
                self.reach_end();
                return Ok(None);
            };
            let keyword = line.keyword();
            if keyword == "@snapshot" {
                self.check_snapshot(&line, world, actor)?;
            } else if TEST_DIRECTIVES.contains(&keyword) {
                self.expectations
                    .run(&line, world)
                    .map_err(|diagnostic| self.script.error(&line, diagnostic))?;
            } else if is_action_name(keyword) {
                let action =
                    parse_action(&line).map_err(|diagnostic| self.located(&line, diagnostic))?;
                self.last_action_line = line.number;
                return Ok(Some(action));
            } else {
                return Err(self.located(&line, unexpected(keyword)));
            }
        }
        Ok(None)
    }

    /// Run whatever test directives remain after the game ended. An action
    /// there is an error: nobody is left to take it.
    ///
    /// # Errors
    ///
    /// As [`ReplayLog::read_action`].
    pub fn finish(&mut self, world: &World) -> Result<(), ReplayError> {
        let actor = world.you().unwrap_or(ThingId::from_u64(0));
        if let Some(action) = self.read_action(world, actor)? {
            return Err(ReplayError::Parse {
                path: self.path.clone(),
                line: self.last_action_line,
                column: 1,
                message: format!("unexpected action after game over: {}", action.name()),
            });
        }
        Ok(())
    }

    /// The error for a replayed action that failed validation.
    pub fn invalid_action(&self) -> ReplayError {
        self.script
            .locate(self.last_action_line, Diagnostic::line("invalid action"))
    }

    fn check_snapshot(
        &mut self,
        line: &Line,
        world: &World,
        actor: ThingId,
    ) -> Result<(), ReplayError> {
        let expected = Snapshot::parse(line, &mut self.script)?;
        let actual = Snapshot::capture(world, self.rng.state(), Some(actor));
        if expected == actual {
            debug!(line = line.number, tick = world.time(), "Snapshot matched");
            return Ok(());
        }
        let (expected_path, actual_path) = match &self.file_path {
            Some(path) => {
                let expected_path = with_suffix(path, ".expected.snapshot");
                let actual_path = with_suffix(path, ".actual.snapshot");
                fs::write(&expected_path, expected.to_text())
                    .map_err(|e| ReplayError::io(expected_path.display().to_string(), e))?;
                fs::write(&actual_path, actual.to_text())
                    .map_err(|e| ReplayError::io(actual_path.display().to_string(), e))?;
                (Some(expected_path), Some(actual_path))
            }
            None => (None, None),
        };
        warn!(line = line.number, tick = world.time(), "Snapshot mismatch");
        Err(ReplayError::CorruptSave {
            path: self.path.clone(),
            line: line.number,
            expected: expected_path,
            actual: actual_path,
        })
    }

    /// Read the `@rng` line for a draw. `None` means the file ended.
    fn read_rng(&mut self, bound: u32, tag: &str) -> Result<Option<u32>, ReplayError> {
        let Some(line) = self.script.next_line()? else {
            self.reach_end();
            return Ok(None);
        };
        if line.keyword() != "@rng" {
            return Err(self.located(
                &line,
                Diagnostic::line(format!("expected rng directive with tag: {tag}")),
            ));
        }
        let value = match line.expect_args(2) {
            Ok([value, logged_tag]) => {
                if logged_tag.text != tag {
                    return Err(self.located(
                        &line,
                        logged_tag.error(format!("rng tag mismatch. expected: {tag}")),
                    ));
                }
                parse_u64(value)
                    .and_then(|v| {
                        u32::try_from(v)
                            .ok()
                            .filter(|v| *v < bound)
                            .ok_or_else(|| value.error(format!("rng value out of range [0, {bound})")))
                    })
                    .map_err(|diagnostic| self.located(&line, diagnostic))?
            }
            Ok(_) => return Err(self.located(&line, Diagnostic::line("expected 2 arguments"))),
            Err(diagnostic) => return Err(self.located(&line, diagnostic)),
        };
        Ok(Some(value))
    }
}

fn unexpected(keyword: &str) -> Diagnostic {
    if keyword == "@rng" {
        Diagnostic::line("unexpected rng directive")
    } else if SNAPSHOT_DIRECTIVES.contains(&keyword) {
        Diagnostic::line("directive used out of context")
    } else if keyword.starts_with('@') {
        Diagnostic::line("undefined directive")
    } else {
        Diagnostic::line("undefined action name")
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl Randomness for ReplayLog {
    fn random_int(&mut self, bound: u32, tag: &str) -> Result<u32, RandomError> {
        if !self.rng.is_test_mode() {
            return self.rng.random_int(bound, tag);
        }
        if bound == 0 {
            return Err(RandomError::EmptyRange {
                tag: tag.to_owned(),
            });
        }
        if self.is_replaying() {
            if let Some(value) = self.read_rng(bound, tag)? {
                return Ok(value);
            }
        }
        let value = self.rng.random_int(bound, tag)?;
        if self.mode == SaveMode::Write {
            self.write_line(&format!("  @rng {value} {tag}"))?;
        }
        Ok(value)
    }

    fn random_id(&mut self) -> Result<ThingId, RandomError> {
        self.rng.random_id()
    }

    fn random_initiative(&mut self) -> Result<Initiative, RandomError> {
        self.rng.random_initiative()
    }

    fn is_test_mode(&self) -> bool {
        self.rng.is_test_mode()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use delve_types::Coord;
    use delve_world::ItemIdentities;
    use delve_world::map::test_level;

    use super::*;

    fn empty_world() -> World {
        World::new(test_level(0), ItemIdentities::identity(), 0)
    }

    #[test]
    fn headers_are_required() {
        let error = ReplayLog::from_script("t", "wait\n", SaveMode::Read).unwrap_err();
        assert_eq!(error.to_string(), "t:1:1: error: expected delve header");
        let error = ReplayLog::from_script("t", "", SaveMode::Read).unwrap_err();
        assert_eq!(error.to_string(), "t:1:1: error: unexpected EOF");
        let log = ReplayLog::from_script("t", "@seed 0000002a\n", SaveMode::Read).unwrap();
        assert_eq!(log.header(), Header::Seed(42));
    }

    #[test]
    fn read_mode_stops_at_end_of_file() {
        let world = empty_world();
        let actor = ThingId::from_u64(1);
        let mut log = ReplayLog::from_script("t", "@test\nwait\nmove 1 0\n", SaveMode::Read).unwrap();
        assert_eq!(log.read_action(&world, actor).unwrap(), Some(Action::Wait));
        assert_eq!(
            log.read_action(&world, actor).unwrap(),
            Some(Action::Move(Coord::new(1, 0)))
        );
        assert_eq!(log.read_action(&world, actor).unwrap(), None);
        assert_eq!(log.mode(), SaveMode::Ignore);
        log.record_action(&world, actor, &Action::Wait).unwrap();
        assert!(log.transcript().is_empty());
    }

    #[test]
    fn read_write_mode_continues_recording() {
        let world = empty_world();
        let actor = ThingId::from_u64(1);
        let mut log = ReplayLog::from_script("t", "@test\nwait\n", SaveMode::ReadWrite).unwrap();
        assert_eq!(log.read_action(&world, actor).unwrap(), Some(Action::Wait));
        assert_eq!(log.read_action(&world, actor).unwrap(), None);
        assert_eq!(log.mode(), SaveMode::Write);
        log.record_action(&world, actor, &Action::GoDown).unwrap();
        let value = log.random_int(6, "beam_range").unwrap();
        assert_eq!(
            log.transcript(),
            &["down".to_owned(), format!("  @rng {value} beam_range")]
        );
    }

    #[test]
    fn test_mode_replays_logged_draws_with_tag_checks() {
        let mut log = ReplayLog::from_script(
            "t",
            "@test\n  @rng 4 spawn_x\n  @rng 2 spawn_y\n",
            SaveMode::Read,
        )
        .unwrap();
        assert_eq!(log.random_int(10, "spawn_x").unwrap(), 4);
        let error = log.random_int(10, "confusion").unwrap_err();
        assert_eq!(
            error.to_string(),
            "t:3:10: error: rng tag mismatch. expected: confusion"
        );
    }

    #[test]
    fn rng_lines_must_be_where_draws_happen() {
        let world = empty_world();
        let mut log = ReplayLog::from_script("t", "@test\n  @rng 1 x\n", SaveMode::Read).unwrap();
        let error = log.read_action(&world, ThingId::from_u64(1)).unwrap_err();
        assert_eq!(error.to_string(), "t:2:1: error: unexpected rng directive");

        let mut log = ReplayLog::from_script("t", "@test\nwait\n", SaveMode::Read).unwrap();
        let error = log.random_int(3, "x").unwrap_err();
        assert_eq!(error.to_string(), "t:2:1: error: expected rng directive with tag: x");
    }

    #[test]
    fn seeded_draws_are_not_logged() {
        let world = empty_world();
        let mut log = ReplayLog::recording(Header::Seed(7), 0);
        let mut plain = SeededRandom::new(7);
        assert_eq!(
            log.random_int(100, "a").unwrap(),
            plain.random_int(100, "a").unwrap()
        );
        log.record_action(&world, ThingId::from_u64(1), &Action::Wait)
            .unwrap();
        assert_eq!(log.transcript(), &["@seed 00000007".to_owned(), "wait".to_owned()]);
    }

    #[test]
    fn snapshots_are_written_and_verified() {
        let world = empty_world();
        let actor = ThingId::from_u64(1);
        let mut recorder = ReplayLog::recording(Header::Seed(3), 1);
        recorder.record_action(&world, actor, &Action::Wait).unwrap();
        let mut text = recorder.transcript().join("\n");
        text.push('\n');
        assert!(text.contains("@snapshot "));

        let mut replay = ReplayLog::from_script("t", &text, SaveMode::Read).unwrap();
        assert_eq!(replay.read_action(&world, actor).unwrap(), Some(Action::Wait));

        let mut changed = empty_world();
        changed.set_time(5);
        let mut replay = ReplayLog::from_script("t", &text, SaveMode::Read).unwrap();
        let error = replay.read_action(&changed, actor).unwrap_err();
        assert_eq!(error.to_string(), "t:2:1: error: corrupt save file");
    }

    #[test]
    fn stray_snapshot_lines_are_out_of_context() {
        let world = empty_world();
        let mut log = ReplayLog::from_script("t", "@test\n@life 1\n", SaveMode::Read).unwrap();
        let error = log.read_action(&world, ThingId::from_u64(1)).unwrap_err();
        assert_eq!(error.to_string(), "t:2:1: error: directive used out of context");
    }

    #[test]
    fn deleting_only_happens_while_writing() {
        let mut log = ReplayLog::from_script("t", "@test\n", SaveMode::Read).unwrap();
        log.delete_save_file().unwrap();
        assert_eq!(log.mode(), SaveMode::Read);
        let mut log = ReplayLog::recording(Header::Test, 0);
        log.delete_save_file().unwrap();
        assert_eq!(log.mode(), SaveMode::Ignore);
    }
}
