//! Placement domain models.
//!
//! Provides the data types shared by the snapshot loader, the trial
//! state, and the persistence boundary.
//!
//! # Domain Mappings
//!
//! | u-assign | Seminars | Internships | Projects |
//! |----------|----------|-------------|----------|
//! | Topic | Seminar topic | Company | Project |
//! | Slot | Seminar group | Position | Team |
//! | Application | Group's wish | Student's wish | Team's bid |
//! | Collection | Wish list | Round | Bid set |

mod application;
mod multimap;
mod pool;
mod record;
mod slot;
mod topic;

pub use application::{Application, CollectionKey};
pub use multimap::MultiMap;
pub use pool::OpenPool;
pub use record::{AcceptedApplication, AssignmentRecord};
pub use slot::Slot;
pub use topic::{Term, Topic};

/// Topic identifier.
pub type TopicId = u64;
/// Application identifier.
pub type ApplicationId = u64;
/// Group identifier.
pub type GroupId = u64;
/// Collection number within a group.
pub type CollectionId = u32;
/// Slot number within a topic (1-based).
pub type SlotId = u32;
/// Term identifier.
pub type TermId = u64;
