//! Embedded, in-memory query engine over immutable record collections.
//!
//! A host application defines named collections of flat records, declares
//! relationships between them (belongs-to, has-one, has-many, has-many
//! through), and builds composable, immutable query expressions (filter,
//! order, limit/offset, pagination) that materialize into wrapped record
//! views exposing raw fields, resolved relations, and memoized derived
//! values.
//!
//! ```
//! use quarry::{Cond, Engine, Order};
//! use bson::doc;
//!
//! let engine = Engine::new();
//! engine.define("posts", |c| {
//!     c.records([
//!         doc! {"id": 1, "title": "Intro", "views": 100, "featured": true},
//!         doc! {"id": 2, "title": "Advanced", "views": 200, "featured": false},
//!     ])
//!     .scope("featured", |q, _args| Ok(q.filter(Cond::new().eq("featured", true))));
//! });
//!
//! let query = engine.query("posts").unwrap();
//! let popular = query.filter(Cond::new().gt("views", 150)).order("id", Order::Asc);
//! assert_eq!(popular.count(), 1);
//! assert_eq!(popular.first().unwrap().get("id"), Some(&bson::Bson::Int32(2)));
//! ```
//!
//! All records are immutable after definition; queries are immutable values
//! that cache their own materialization, and record views memoize relation
//! and derived-value access for their lifetime. Evaluation is a linear scan
//! with no indexing, fully synchronous, with no I/O in the core.

pub mod collection;
pub mod engine;
pub mod errors;
pub mod query;
pub mod record;
pub mod relations;
pub mod view;

pub use collection::{Collection, CollectionBuilder, RelationOpts, ScopeFn};
pub use engine::{Engine, EngineOptions};
pub use errors::EngineError;
pub use query::{Cond, Matcher, Order, Page, Query};
pub use record::Record;
pub use relations::{Related, RelationSpec};
pub use view::{Attr, CapabilityFn, PresenterBuilder, RecordView, RESERVED_FIELDS};
