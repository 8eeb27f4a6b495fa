//! Action validation, costs, and application.
//!
//! An action proposed by a decision maker is first checked by
//! [`validation::validate_action`], then applied by
//! [`handlers::execute_action`], and finally charged for with
//! [`costs::charge`].
//!
//! # Submodules
//!
//! - [`costs`] -- Time costs and the poised check.
//! - [`effects`] -- Status effects, damage, death, and potion effects shared by
//!   handlers and aging.
//! - [`handlers`] -- Execution logic for each action.
//! - [`validation`] -- The staged validation pipeline.

pub mod costs;
pub mod effects;
pub mod handlers;
pub mod validation;
