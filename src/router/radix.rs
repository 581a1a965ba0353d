//! Radix tree route matching.
//!
//! Paths are split into segments. Static segments (`list`) match exactly and
//! are tried first; parameter segments (`{key}`) match any single segment.
//! Lookup backtracks when a static branch dead-ends, so
//! `/list/{key}/length` still matches a key literally named `db`.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::{ParamVec, RouteMeta};

#[derive(Clone, Default)]
struct RadixNode {
    /// Static segment this node matches (empty for the root and param nodes)
    segment: String,
    /// Terminal routes, per method
    routes: HashMap<Method, Arc<RouteMeta>>,
    /// Set for `{name}` nodes
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode>,
    /// Several names may share a position (`/{id}/a` and `/{key}/b`)
    param_children: Vec<RadixNode>,
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

impl RadixNode {
    fn insert(&mut self, segments: &[&str], route: Arc<RouteMeta>) {
        let Some((segment, remaining)) = segments.split_first() else {
            self.routes.insert(route.method.clone(), route);
            return;
        };

        if let Some(name) = param_name(segment) {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                child.insert(remaining, route);
                return;
            }
            let mut child = RadixNode {
                param_name: Some(Arc::from(name)),
                ..RadixNode::default()
            };
            child.insert(remaining, route);
            self.param_children.push(child);
            return;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            child.insert(remaining, route);
            return;
        }
        let mut child = RadixNode {
            segment: (*segment).to_string(),
            ..RadixNode::default()
        };
        child.insert(remaining, route);
        self.children.push(child);
    }

    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
    ) -> Option<Arc<RouteMeta>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.get(method).cloned();
        };

        for child in self.children.iter().filter(|c| c.segment == *segment) {
            if let Some(route) = child.search(remaining, method, params) {
                return Some(route);
            }
        }

        for child in &self.param_children {
            let Some(name) = &child.param_name else {
                continue;
            };
            let value = urlencoding::decode(segment)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| (*segment).to_string());
            params.push((Arc::clone(name), value));
            if let Some(route) = child.search(remaining, method, params) {
                return Some(route);
            }
            params.pop();
        }

        None
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Route table keyed by full path (base path included).
#[derive(Clone, Default)]
pub struct RadixRouter {
    root: RadixNode,
}

impl RadixRouter {
    pub fn new(base_path: &str, routes: &[Arc<RouteMeta>]) -> Self {
        let mut root = RadixNode::default();
        for route in routes {
            let full_path = format!("{base_path}{}", route.path_pattern);
            root.insert(&segments(&full_path), Arc::clone(route));
        }
        Self { root }
    }

    pub fn route(&self, method: &Method, path: &str) -> Option<(Arc<RouteMeta>, ParamVec)> {
        let mut params = ParamVec::new();
        let route = self.root.search(&segments(path), method, &mut params)?;
        Some((route, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(path: &str, handler: &str) -> Arc<RouteMeta> {
        Arc::new(RouteMeta::new(Method::GET, path, handler))
    }

    fn param<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_static_and_param_segments() {
        let router = RadixRouter::new(
            "/api",
            &[
                meta("/list/{key}/length", "length"),
                meta("/list/{key}/index/{index}", "index"),
                meta("/list/{key}/index/{index}/string", "index_string"),
            ],
        );
        let (route, params) = router.route(&Method::GET, "/api/list/k1/index/4").unwrap();
        assert_eq!(&*route.handler_name, "index");
        assert_eq!(param(&params, "key"), Some("k1"));
        assert_eq!(param(&params, "index"), Some("4"));

        let (route, _) = router
            .route(&Method::GET, "/api/list/k1/index/4/string")
            .unwrap();
        assert_eq!(&*route.handler_name, "index_string");
        assert!(router.route(&Method::GET, "/list/k1/length").is_none());
        assert!(router.route(&Method::POST, "/api/list/k1/length").is_none());
    }

    #[test]
    fn test_backtracks_out_of_static_branch() {
        let router = RadixRouter::new(
            "",
            &[
                meta("/c/{id}/db/{db}/list/{key}/length", "with_db"),
                meta("/c/{id}/list/{key}/length", "without_db"),
            ],
        );
        let (route, params) = router.route(&Method::GET, "/c/x/list/db/length").unwrap();
        assert_eq!(&*route.handler_name, "without_db");
        assert_eq!(param(&params, "key"), Some("db"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_param_values_are_percent_decoded() {
        let router = RadixRouter::new("", &[meta("/list/{key}/length", "length")]);
        let (_, params) = router.route(&Method::GET, "/list/a%20b%2Fc/length").unwrap();
        assert_eq!(param(&params, "key"), Some("a b/c"));
    }
}
