//! Configuration, decision plumbing, meetings, and game orchestration for the
//! Skeld simulation.
//!
//! This crate owns the global phase machine that drives a game:
//! Lobby, Starting, Playing, Meeting, and Game Over.
//!
//! # Modules
//!
//! - [`chat`] -- Meeting chat lines and keyword analysis (accusations,
//!   defenses, social commands).
//! - [`config`] -- Configuration loading from `skeld-config.yaml` into
//!   strongly-typed structs.
//! - [`decision`] -- [`DecisionProvider`] trait, request contexts, reply
//!   polling, and reply interpretation.
//! - [`dialogue`] -- Rule-based discussion scripts and votes used whenever
//!   the provider is offline or fails.
//! - [`game`] -- The [`Game`] orchestrator and its tick cycle.
//! - [`history`] -- Cross-meeting memory: records, trust, ejections.
//! - [`meeting`] -- The [`MeetingEngine`] phase machine.
//!
//! [`DecisionProvider`]: decision::DecisionProvider
//! [`Game`]: game::Game
//! [`MeetingEngine`]: meeting::MeetingEngine

pub mod chat;
pub mod config;
pub mod decision;
pub mod dialogue;
pub mod game;
pub mod history;
pub mod meeting;
