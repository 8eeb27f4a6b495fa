//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use delve_events::SaveMode;

/// Save file used when none is named.
pub const DEFAULT_SAVE_FILE: &str = "delve.save";

/// What to do with the save file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Start a new seeded game, replacing the save file.
    New,
    /// Start a new test-mode game, replacing the save file.
    NewTest,
    /// Replay the save file without changing it.
    Replay,
    /// Replay the save file, then keep playing and recording.
    Resume,
    /// Play a new game without a save file.
    NoSave,
}

impl StartMode {
    /// The log mode a game started this way ends up in.
    pub const fn save_mode(self) -> SaveMode {
        match self {
            Self::New | Self::NewTest => SaveMode::Write,
            Self::Replay => SaveMode::Read,
            Self::Resume => SaveMode::ReadWrite,
            Self::NoSave => SaveMode::Ignore,
        }
    }
}

/// Deterministic dungeon simulation.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").args(["new", "replay", "resume", "no_save", "record_test"])))]
#[allow(clippy::struct_excessive_bools)]
pub struct CliArgs {
    /// Save file to record into or replay from.
    #[arg(value_name = "SAVE_FILE", default_value = DEFAULT_SAVE_FILE)]
    pub save_file: PathBuf,

    /// Start a new game, replacing the save file.
    #[arg(long)]
    pub new: bool,

    /// Replay the save file without recording anything.
    #[arg(long)]
    pub replay: bool,

    /// Replay the save file, then continue it (the default).
    #[arg(long)]
    pub resume: bool,

    /// Play without a save file.
    #[arg(long = "no-save")]
    pub no_save: bool,

    /// Start a new game in deterministic test mode, logging every random
    /// draw.
    #[arg(long = "record-test")]
    pub record_test: bool,

    /// Frames to wait between replayed actions.
    #[arg(long = "replay-delay", value_name = "FRAMES")]
    pub replay_delay: Option<u32>,

    /// Replay with no presentation and exit when the save file runs out.
    #[arg(long)]
    pub headless: bool,

    /// Print scheduler summaries and the player's narration to stderr.
    #[arg(long)]
    pub diagnostics: bool,

    /// Configuration file. Defaults to `delve-config.yaml` when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// The chosen start mode; resuming when nothing was chosen.
    pub const fn start_mode(&self) -> StartMode {
        if self.new {
            StartMode::New
        } else if self.record_test {
            StartMode::NewTest
        } else if self.replay {
            StartMode::Replay
        } else if self.no_save {
            StartMode::NoSave
        } else {
            StartMode::Resume
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resume_the_default_save() {
        let args = CliArgs::try_parse_from(["delve"]).unwrap();
        assert_eq!(args.save_file, PathBuf::from(DEFAULT_SAVE_FILE));
        assert_eq!(args.start_mode(), StartMode::Resume);
        assert_eq!(args.start_mode().save_mode(), SaveMode::ReadWrite);
        assert!(!args.headless);
        assert_eq!(args.replay_delay, None);
    }

    #[test]
    fn flags_select_the_mode() {
        let args = CliArgs::try_parse_from([
            "delve",
            "run.save",
            "--replay",
            "--headless",
            "--replay-delay",
            "3",
        ])
        .unwrap();
        assert_eq!(args.save_file, PathBuf::from("run.save"));
        assert_eq!(args.start_mode(), StartMode::Replay);
        assert!(args.headless);
        assert_eq!(args.replay_delay, Some(3));

        let args = CliArgs::try_parse_from(["delve", "--record-test"]).unwrap();
        assert_eq!(args.start_mode(), StartMode::NewTest);
        assert_eq!(args.start_mode().save_mode(), SaveMode::Write);
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(CliArgs::try_parse_from(["delve", "--new", "--replay"]).is_err());
        assert!(CliArgs::try_parse_from(["delve", "--no-save", "--record-test"]).is_err());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(CliArgs::try_parse_from(["delve", "--replay-delay", "soon"]).is_err());
    }
}
