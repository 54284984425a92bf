//! # Particle Engine
//!
//! A module-stack particle effect simulation engine built with Rust.
//!
//! ## Features
//!
//! - **Module Stacks**: every particle attribute (position, velocity, color, ...) is the
//!   left-fold of an ordered list of modules, each blending its own contribution
//! - **Property Resolution**: constants, seeded random ranges, curves driven by system
//!   inputs, references into a shared stack and named external parameters
//! - **Integration**: rate-based (acceleration/velocity) and directly authored values
//!   compose instead of overwriting each other
//! - **Events**: creator/listener modules exchange named events across an emitter hierarchy
//! - **ECS**: `bevy_ecs` component and system for driving effects from a host world
//!
//! ## Architecture Design
//!
//! One [`particles::Emitter`] owns a fixed-capacity [`particles::ParticlePool`], the channel
//! arrays and one stack per channel. Each frame runs in a fixed order:
//!
//! ```text
//! clock → reap dead → spawn rate → admit spawns → death stacks
//!       → channel stacks (+ multi-function pass) → integration → render
//! ```
//!
//! ### Example
//!
//! ```ignore
//! use particle_engine::particles::{Emitter, HostInputs, Module, Property};
//! use particle_engine::particles::ChannelId;
//!
//! let mut emitter = Emitter::new("sparks", Default::default());
//! emitter.stacks.spawn_rate.push(Module::value("rate", Property::scalar(20.0)));
//! emitter.tick_standalone(1.0 / 60.0, &HostInputs::default());
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Error types and helper macros
//! - [`config`]: Configuration loading and logging setup
//! - [`math`]: Random streams, curves, blend algebra, coordinate conversion
//! - [`particles`]: Pool, stacks, modules, integration, events, emitters
//! - [`ecs`]: bevy_ecs integration

/// Core error types and helper macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Math helpers shared by the simulation
pub mod math;
/// Module-stack particle simulation
pub mod particles;
/// Entity Component System integration
pub mod ecs;

pub use crate::core::{ParticleError, ParticleResult};
