//! # Hostkit
//!
//! Network device inventory: raw device records plus group and default
//! templates, resolved into hosts whose attributes can be looked up through
//! an inheritance chain.
//!
//! ## Core Concepts
//!
//! - **Defaults**: the bottom-of-chain fallback for one load
//! - **Group**: a named attribute template with ordered parent groups
//! - **Host**: one device; attributes resolve host -> groups (with their
//!   parents, depth-first) -> defaults
//! - **DocumentSource**: where raw records come from; MongoDB, JSON files on
//!   disk, or memory
//! - **InventoryLoader**: fetches records from a [`DocumentSource`], applies
//!   transformations and builds the [`Inventory`]
//! - **Extension**: a named capability bound to each host at load time
//!
//! ## Example
//!
//! ```ignore
//! use hostkit::{InventoryLoader, Query, source, template};
//! use std::path::Path;
//!
//! let groups = template::load_groups(Path::new("groups.yaml"))?;
//! let defaults = template::load_defaults(Path::new("defaults.yaml"))?;
//!
//! let inventory = InventoryLoader::new(source::open("mongodb://inventory.example.net:27017")?, "network_inventory", "devices")
//!     .with_query(Query::all().eq("site", "hq"))
//!     .with_templates(defaults, &groups)?
//!     .load()?;
//!
//! for host in inventory.hosts.values() {
//!     println!("{} {:?} {:?}", host.name(), host.hostname(), host.platform());
//! }
//! ```

pub mod error;
pub mod extension;
pub mod groups;
pub mod host;
pub mod inventory;
pub mod loader;
pub mod model;
pub mod mongo;
pub mod source;
pub mod template;
pub mod transform;
pub mod transport;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use extension::{Extension, ExtensionCall, ExtensionFactory, ExtensionRegistry};
pub use groups::{GroupDefinition, GroupMap, resolve_groups};
pub use host::Host;
pub use inventory::Inventory;
pub use loader::{DuplicateHosts, InventoryLoader};
pub use model::{ConnectionMap, ConnectionOptions, Data, Defaults, Group, Record};
pub use mongo::MongoDocumentSource;
pub use source::{DocumentSource, FileDocumentSource, MemoryDocumentSource, Query};
pub use transform::{FieldTransform, Transform};
pub use transport::CommandTransport;
