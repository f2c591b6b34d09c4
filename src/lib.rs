//! Seminar placement engine for the U-Engine ecosystem.
//!
//! Assigns student groups to capacity-bounded slots of topics. Each group
//! ranks several topics per collection; at most one application of a
//! collection may be accepted. Many randomized greedy trials run in
//! parallel and the best-scoring one is persisted.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Topic`, `Application`, `Slot`, `Term`,
//!   persisted `AssignmentRecord`, the `MultiMap`/`OpenPool` indexes
//! - **`scoring`**: Priority-based score and the unassigned penalty
//! - **`store`**: `AssignmentStore` persistence boundary + `InMemoryStore`
//! - **`snapshot`**: Loads the immutable starting state of a run
//! - **`trial`**: Trial state, placement strategy, greedy loop
//! - **`optimizer`**: Multi-trial worker pool, progress, run report
//! - **`validation`**: Input integrity and trial invariant checks
//! - **`config`**: TOML-loadable optimizer settings
//! - **`error`**: Error types
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use u_assign::config::OptimizerConfig;
//! use u_assign::models::{Application, Term, Topic};
//! use u_assign::optimizer::Optimizer;
//! use u_assign::store::InMemoryStore;
//!
//! let store = Arc::new(
//!     InMemoryStore::new()
//!         .with_term(Term::new(1, "WS 2026"))
//!         .with_topic(Topic::new(1).with_slots(2).with_slot_size(2, 4))
//!         .with_topic(Topic::new(2).with_slots(1).with_slot_size(1, 3))
//!         .with_application(Application::new(1, 1, 1, 1).with_size(2))
//!         .with_application(Application::new(2, 1, 1, 2).with_size(2).with_priority(2))
//!         .with_application(Application::new(3, 2, 1, 2).with_size(3)),
//! );
//!
//! let optimizer = Optimizer::new(Arc::clone(&store), OptimizerConfig::new().with_seed(7)).unwrap();
//! let report = optimizer.run_optimization(false).unwrap();
//! assert_eq!(report.best_score, 40);
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod scoring;
pub mod snapshot;
pub mod store;
pub mod trial;
pub mod validation;
