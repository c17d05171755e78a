//! # orrery_runtime
//!
//! Host-side collaborators for the orrery engine: step environments that
//! drive [`Engine::step`](orrery_core::Engine::step) on a cadence, and
//! asset loaders implementing the [`Loader`](orrery_core::Loader)
//! contract.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orrery_core::{Engine, EngineConfig, Registry};
//! use orrery_runtime::{Environment, FileLoader, FixedStepEnvironment};
//!
//! let mut engine = Engine::new(Registry::new(), EngineConfig::default());
//! engine.set_loader(Box::new(FileLoader::new("assets")));
//! engine.run();
//! FixedStepEnvironment::new().run(&mut engine).unwrap();
//! ```

pub mod environment;
pub mod loader;

pub use environment::{Environment, FixedStepEnvironment, HeadlessEnvironment};
pub use loader::{FileLoader, MemoryLoader};
