//! Precompile route tables into directly loadable matcher literals.
//!
//! `oxide-optimize` reads an application's routes from declarative
//! manifests, compiles them with [`oxide_route_compiler`], and splices the
//! result into the source file that constructs the application's matcher.
//!
//! # Architecture
//!
//! - **Manifest** - Routes, mounts and middleware in declaration order
//! - **Catalog** - The middleware names that may be applied application-wide
//! - **Entry** - Manifest discovery and output path conventions
//! - **Writer** - Call-site splicing and atomic file output
//! - **Optimizer** - One end-to-end run
//!
//! # CLI Usage
//!
//! ```bash
//! # Compile routes.json (or src/routes.json) into src/router-optimized.ts
//! oxide-optimize optimize
//!
//! # Splice into an existing source, applying middleware to every route
//! oxide-optimize optimize --target src/app.ts --use logger --use cors
//!
//! # List routes and whether each can be combined
//! oxide-optimize routes
//! ```

pub mod catalog;
pub mod entry;
pub mod error;
pub mod manifest;
pub mod optimizer;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::MiddlewareCatalog;
    pub use crate::error::{OptimizeError, Result};
    pub use crate::manifest::{Manifest, ManifestEntry, ManifestSource};
    pub use crate::optimizer::{
        describe_routes, load_source, optimize, OptimizeConfig, OptimizeReport, RouteRow,
    };
}
