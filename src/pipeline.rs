//! # Pipeline Module
//!
//! A [`PipelineInstance`] is one fully built copy of the gateway: route table,
//! middleware chain, handler worker pools and format registry. Instances are
//! produced by [`build`] from a [`Registrations`] value, which only *describes*
//! the pipeline, so the same description can be built more than once.
//!
//! ```rust,ignore
//! let registrations = gateway_registrations(&catalog, Some("application/json"));
//! let primary = build_named(&registrations, "primary")?;
//! let secondary = build_named(&registrations, "secondary")?;
//!
//! let resp = secondary.call(
//!     PipelineRequest::get("/api/redis/connection/local/list/mykey/length")
//!         .header("accept", "application/json"),
//! );
//! assert_eq!(resp.status, 200);
//! ```
//!
//! Two instances share nothing mutable: each has its own registry, router,
//! metrics counters and handler worker pools. The only thing they have in common
//! is whatever external state the handler closures capture, such as the
//! [`ConnectionCatalog`].

use http::Method;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse, HeaderVec};
use crate::format::{register_defaults, FormatRegistry, FormatSelector, RegistryError};
use crate::handlers::{self, HandlerFn, HandlerResult};
use crate::ids::RequestId;
use crate::middleware::{MetricsMiddleware, Middleware, TracingMiddleware};
use crate::router::{ParamVec, RouteMeta, Router};
use crate::store::ConnectionCatalog;
use crate::worker_pool::WorkerPoolConfig;

/// Base path every gateway route lives under.
pub const BASE_PATH: &str = "/api";

/// Default media type of the reference deployment.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// Populates a fresh [`FormatRegistry`] for each build.
pub type FormatSetup = Arc<dyn Fn(&mut FormatRegistry) + Send + Sync>;

/// Creates a fresh middleware for each build.
pub type MiddlewareFactory = Arc<dyn Fn() -> Arc<dyn Middleware> + Send + Sync>;

/// Description of a pipeline. Cheap to clone; building it has no side
/// effects on the description itself.
#[derive(Clone)]
pub struct Registrations {
    base_path: String,
    format_setup: FormatSetup,
    default_media_type: Option<String>,
    handlers: Vec<(String, HandlerFn)>,
    routes: Vec<RouteMeta>,
    middleware: Vec<MiddlewareFactory>,
    worker_pool: WorkerPoolConfig,
}

impl Registrations {
    /// Empty description with the built-in formats and no default media type.
    #[must_use]
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            format_setup: Arc::new(register_defaults),
            default_media_type: None,
            handlers: Vec::new(),
            routes: Vec::new(),
            middleware: Vec::new(),
            worker_pool: WorkerPoolConfig::default(),
        }
    }

    /// Register a handler under `name`. A second registration with the same
    /// name replaces the first.
    #[must_use]
    pub fn handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.retain(|(n, _)| n != name);
        self.handlers.push((name.to_string(), Arc::new(handler)));
        self
    }

    #[must_use]
    pub fn route(mut self, method: Method, path_pattern: &str, handler_name: &str) -> Self {
        self.routes
            .push(RouteMeta::new(method, path_pattern, handler_name));
        self
    }

    #[must_use]
    pub fn with_default_media_type(mut self, media_type: Option<&str>) -> Self {
        self.default_media_type = media_type.map(str::to_string);
        self
    }

    /// Replace the registration routine run against each new registry.
    #[must_use]
    pub fn with_format_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut FormatRegistry) + Send + Sync + 'static,
    {
        self.format_setup = Arc::new(setup);
        self
    }

    /// Add a middleware factory; runs after the built-in metrics middleware.
    #[must_use]
    pub fn middleware<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.worker_pool.stack_size = stack_size;
        self
    }

    /// Worker coroutines per handler; zero is raised to one.
    #[must_use]
    pub fn with_handler_workers(mut self, num_workers: usize) -> Self {
        self.worker_pool = WorkerPoolConfig::new(num_workers, self.worker_pool.stack_size);
        self
    }

    #[must_use]
    pub fn worker_pool(&self) -> WorkerPoolConfig {
        self.worker_pool
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn default_media_type(&self) -> Option<&str> {
        self.default_media_type.as_deref()
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteMeta] {
        &self.routes
    }

    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl fmt::Debug for Registrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrations")
            .field("base_path", &self.base_path)
            .field("default_media_type", &self.default_media_type)
            .field("handlers", &self.handler_names())
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("worker_pool", &self.worker_pool)
            .finish()
    }
}

/// The gateway's registrations: list handlers, their routes under `/api`,
/// the built-in formats and request tracing.
#[must_use]
pub fn gateway_registrations(
    catalog: &Arc<ConnectionCatalog>,
    default_media_type: Option<&str>,
) -> Registrations {
    let registrations = Registrations::new(BASE_PATH)
        .with_default_media_type(default_media_type)
        .middleware(|| Arc::new(TracingMiddleware) as Arc<dyn Middleware>);
    handlers::list::register(registrations, catalog)
}

/// Why a pipeline could not be built.
#[derive(Debug)]
pub enum BuildError {
    /// The format registry failed validation
    Registry(RegistryError),
    /// A route names a handler that was never registered
    MissingHandler { handler: String, path: String },
    /// A handler worker coroutine could not be spawned
    Spawn { handler: String, source: io::Error },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Registry(e) => write!(f, "invalid format registry: {e}"),
            BuildError::MissingHandler { handler, path } => {
                write!(f, "route '{path}' refers to unregistered handler '{handler}'")
            }
            BuildError::Spawn { handler, source } => {
                write!(f, "failed to spawn handler '{handler}': {source}")
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Registry(e) => Some(e),
            BuildError::Spawn { source, .. } => Some(source),
            BuildError::MissingHandler { .. } => None,
        }
    }
}

impl From<RegistryError> for BuildError {
    fn from(e: RegistryError) -> Self {
        BuildError::Registry(e)
    }
}

/// Build an instance labelled `pipeline`.
///
/// # Errors
///
/// See [`build_named`].
pub fn build(registrations: &Registrations) -> Result<PipelineInstance, BuildError> {
    build_named(registrations, "pipeline")
}

/// Build a fresh instance from `registrations`.
///
/// `label` only tags logs and metrics.
///
/// # Errors
///
/// Returns [`BuildError`] when the registry does not validate, a route has no
/// handler, or a handler worker cannot be spawned.
pub fn build_named(
    registrations: &Registrations,
    label: &str,
) -> Result<PipelineInstance, BuildError> {
    let default_media_type = registrations.default_media_type();

    let mut registry = FormatRegistry::new();
    (registrations.format_setup)(&mut registry);
    registry.validate(default_media_type)?;
    let registry = Arc::new(registry);

    for route in &registrations.routes {
        if !registrations
            .handlers
            .iter()
            .any(|(name, _)| name.as_str() == &*route.handler_name)
        {
            return Err(BuildError::MissingHandler {
                handler: route.handler_name.to_string(),
                path: route.path_pattern.to_string(),
            });
        }
    }
    let router = Router::new(&registrations.base_path, registrations.routes.clone());

    let mut dispatcher = Dispatcher::new(FormatSelector::new(
        Arc::clone(&registry),
        default_media_type,
    ));
    let metrics = Arc::new(MetricsMiddleware::new());
    dispatcher.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>);
    for factory in &registrations.middleware {
        dispatcher.add_middleware(factory());
    }

    for (name, handler) in &registrations.handlers {
        // SAFETY: the may runtime is configured before any pipeline is built
        // and list handlers never block the worker thread.
        unsafe { dispatcher.register_handler(name, Arc::clone(handler), registrations.worker_pool) }
            .map_err(|source| BuildError::Spawn {
                handler: name.clone(),
                source,
            })?;
    }

    info!(
        instance = %label,
        base_path = %router.base_path(),
        routes = router.routes().len(),
        handlers = registrations.handlers.len(),
        handler_workers = registrations.worker_pool.num_workers,
        encoders = registry.encoders().len(),
        tokens = registry.descriptors().len(),
        default_media_type = ?default_media_type,
        "Pipeline instance built"
    );

    Ok(PipelineInstance {
        label: Arc::from(label),
        router,
        dispatcher,
        metrics,
        registry,
    })
}

/// A request handed to a pipeline, from the network or from in-process
/// callers.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub method: Method,
    /// Path, optionally followed by `?query`
    pub path: String,
    /// Header names are stored lowercase
    pub headers: HeaderVec,
}

impl PipelineRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    /// Split `path` into the path proper and the raw query string.
    #[must_use]
    pub fn path_and_query(&self) -> (&str, &str) {
        self.path.split_once('?').unwrap_or((self.path.as_str(), ""))
    }
}

/// Decode `a=1&b=x%20y` into parameter pairs.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// One immutable, fully built pipeline.
pub struct PipelineInstance {
    label: Arc<str>,
    router: Router,
    dispatcher: Dispatcher,
    metrics: Arc<MetricsMiddleware>,
    registry: Arc<FormatRegistry>,
}

impl PipelineInstance {
    /// Route, dispatch and encode one request.
    ///
    /// Unknown routes answer an empty 404 without reaching a handler.
    #[must_use]
    pub fn call(&self, request: PipelineRequest) -> HandlerResponse {
        let PipelineRequest {
            method,
            path,
            headers,
        } = request;
        let (path, query) = path.split_once('?').unwrap_or((path.as_str(), ""));
        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("x-request-id"))
                .map(|(_, v)| v.as_str()),
        );

        let Some(mut route_match) = self.router.route(method, path) else {
            self.metrics.inc_top_level_request();
            debug!(instance = %self.label, request_id = %request_id, path = %path, "Unknown route");
            return HandlerResponse::empty(404);
        };
        route_match.query_params = parse_query(query);
        self.dispatcher
            .dispatch(route_match, path.to_string(), headers, request_id)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn metrics(&self) -> &MetricsMiddleware {
        &self.metrics
    }

    /// Shared handle to this instance's metrics, for the HTTP layer.
    #[must_use]
    pub fn metrics_handle(&self) -> Arc<MetricsMiddleware> {
        Arc::clone(&self.metrics)
    }

    #[must_use]
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn default_media_type(&self) -> Option<&str> {
        self.dispatcher.selector().default_media_type()
    }
}

impl fmt::Debug for PipelineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineInstance")
            .field("label", &self.label)
            .field("routes", &self.router.routes().len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
