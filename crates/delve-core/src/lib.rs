//! Scheduler, vision, perception, and action resolution for the Delve
//! simulation.
//!
//! This crate turns the passive data of `delve-world` into a running game:
//! it decides who acts when, what each individual can see, what each one
//! makes of every change to the world, and what every action does.
//!
//! # Modules
//!
//! - [`actions`] -- Action validation, costs, and execution.
//! - [`aging`] -- Per-tick regeneration, poison, expiry, and auto-throwing.
//! - [`config`] -- Configuration loading from `delve-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- [`StepContext`], the borrowed state one step works on.
//! - [`decision`] -- [`Decider`] trait with human and AI implementations.
//! - [`error`] -- [`CoreError`].
//! - [`game`] -- [`Game`], the scheduler and the explicit game context.
//! - [`narration`] -- Sentences built from perceived events.
//! - [`path`] -- Breadth-first path finding over an individual's knowledge.
//! - [`perception`] -- The event/perception pipeline.
//! - [`vision`] -- Per-individual vision and line of sight.
//!
//! [`StepContext`]: context::StepContext
//! [`Decider`]: decision::Decider
//! [`CoreError`]: error::CoreError
//! [`Game`]: game::Game

pub mod actions;
pub mod aging;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod game;
pub mod narration;
pub mod path;
pub mod perception;
pub mod vision;

pub use config::SimulationConfig;
pub use error::CoreError;
pub use game::{AdvanceOutcome, Game};
