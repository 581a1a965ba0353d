use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::radix::RadixRouter;

/// Maximum number of path/query parameters before heap allocation.
/// List routes carry at most four path params.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter storage for the hot path. Names come from the route table and
/// are shared; values are per request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route: method + pattern relative to the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMeta {
    pub method: Method,
    /// e.g. `/redis/connection/{connectionId}/list/{key}/length`
    pub path_pattern: Arc<str>,
    pub handler_name: Arc<str>,
}

impl RouteMeta {
    #[must_use]
    pub fn new(method: Method, path_pattern: &str, handler_name: &str) -> Self {
        Self {
            method,
            path_pattern: Arc::from(path_pattern),
            handler_name: Arc::from(handler_name),
        }
    }
}

/// Result of matching a request path.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    pub path_params: ParamVec,
    pub handler_name: Arc<str>,
    /// Filled in by the caller from the query string
    pub query_params: ParamVec,
    /// Token taken from a `.{format}` suffix on the last segment
    pub format: Option<String>,
}

impl RouteMatch {
    /// Last occurrence wins for repeated names.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Split `.../range.csv` into (`.../range`, `csv`).
///
/// Only the last segment is considered; a leading dot (`/.hidden`) or a
/// trailing dot is not a format suffix.
#[must_use]
pub fn split_format_suffix(path: &str) -> Option<(&str, &str)> {
    let last_segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let dot = path[last_segment_start..].rfind('.')? + last_segment_start;
    let (stem, token) = (&path[..dot], &path[dot + 1..]);
    if dot == last_segment_start || token.is_empty() {
        return None;
    }
    Some((stem, token))
}

/// Radix-tree router for one pipeline instance.
#[derive(Clone)]
pub struct Router {
    radix_router: RadixRouter,
    routes: Vec<Arc<RouteMeta>>,
    /// Prefix for all routes, e.g. `/api`
    base_path: String,
}

impl Router {
    #[must_use]
    pub fn new(base_path: &str, routes: Vec<RouteMeta>) -> Self {
        let base_path = base_path.trim_end_matches('/').to_string();
        let routes: Vec<Arc<RouteMeta>> = routes.into_iter().map(Arc::new).collect();
        let radix_router = RadixRouter::new(&base_path, &routes);

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}{}", r.method, base_path, r.path_pattern))
            .collect();
        info!(
            routes_count = routes.len(),
            base_path = %base_path,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            radix_router,
            routes,
            base_path,
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteMeta>] {
        &self.routes
    }

    /// Full path patterns (base path included), in registration order.
    #[must_use]
    pub fn get_all_path_patterns(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{}{}", self.base_path, r.path_pattern))
            .collect()
    }

    /// Match `path` (no query string).
    ///
    /// A `.{format}` suffix on the last segment is tried first; if the
    /// stripped path matches nothing, the full path is matched without a
    /// format token. At most one route matches.
    #[must_use]
    pub fn route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let result = split_format_suffix(path)
            .and_then(|(stem, token)| {
                self.radix_router
                    .route(&method, stem)
                    .map(|(route, params)| (route, params, Some(token.to_ascii_lowercase())))
            })
            .or_else(|| {
                self.radix_router
                    .route(&method, path)
                    .map(|(route, params)| (route, params, None))
            });

        let duration = match_start.elapsed();
        let Some((route, path_params, format)) = result else {
            warn!(
                method = %method,
                path = %path,
                duration_us = duration.as_micros(),
                "No route matched"
            );
            return None;
        };

        if duration > Duration::from_millis(1) {
            warn!(
                method = %method,
                path = %path,
                handler_name = %route.handler_name,
                duration_us = duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                method = %method,
                path = %path,
                handler_name = %route.handler_name,
                route_pattern = %route.path_pattern,
                format = ?format,
                path_params = ?path_params,
                "Route matched"
            );
        }

        Some(RouteMatch {
            handler_name: Arc::clone(&route.handler_name),
            route,
            path_params,
            query_params: ParamVec::new(),
            format,
        })
    }
}
