//! # Router Module
//!
//! Maps `(method, path)` to a [`RouteMeta`] and its path parameters using a
//! radix tree. Route patterns are relative to the pipeline's base path
//! (`/api`), and the last segment may carry a `.{format}` suffix which is
//! returned separately as the explicit format token.
//!
//! ```rust,ignore
//! use detectors::router::{RouteMeta, Router};
//! use http::Method;
//!
//! let router = Router::new("/api", vec![RouteMeta::new(
//!     Method::GET,
//!     "/redis/connection/{connectionId}/list/{key}/range",
//!     "list_range",
//! )]);
//! let m = router.route(Method::GET, "/api/redis/connection/local/list/mykey/range.csv").unwrap();
//! assert_eq!(m.format.as_deref(), Some("csv"));
//! assert_eq!(m.get_path_param("key"), Some("mykey"));
//! ```

mod core;
mod radix;

pub use core::{split_format_suffix, ParamVec, RouteMatch, RouteMeta, Router, MAX_INLINE_PARAMS};
