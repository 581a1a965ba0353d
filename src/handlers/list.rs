//! Keyed list operations.
//!
//! Every operation follows the same contract:
//! - unknown connection → [`ResultValue::Absent`] (404)
//! - malformed `dbId`/`index`/`start`/`stop` → [`HandlerFault::InvalidParameter`] (400)
//! - store failure → [`HandlerFault::Store`] (500)
//!
//! The store lease is scoped to the call and released on every exit path.

use std::str::FromStr;
use std::sync::Arc;

use http::Method;

use super::{HandlerFault, HandlerResult};
use crate::dispatcher::HandlerRequest;
use crate::pipeline::Registrations;
use crate::store::{ConnectionCatalog, DEFAULT_DB};
use crate::value::{Element, ResultValue};

/// Route prefixes; the second selects a database explicitly.
pub const CONNECTION_PREFIXES: [&str; 2] = [
    "/redis/connection/{connectionId}",
    "/redis/connection/{connectionId}/db/{dbId}",
];

type ListOperation = fn(&ConnectionCatalog, &HandlerRequest) -> HandlerResult;

/// `(path under the prefix, handler name, operation)`
pub const LIST_ROUTES: [(&str, &str, ListOperation); 5] = [
    ("/list/{key}/length", "list_length", list_length),
    ("/list/{key}/index/{index}", "list_index", list_index),
    ("/list/{key}/index/{index}/string", "list_index_string", list_index_string),
    ("/list/{key}/range", "list_range", list_range),
    ("/list/{key}/range/string", "list_range_string", list_range_string),
];

/// Register the list handlers and both route variants of each operation.
#[must_use]
pub fn register(mut registrations: Registrations, catalog: &Arc<ConnectionCatalog>) -> Registrations {
    for (suffix, name, operation) in LIST_ROUTES {
        let catalog = Arc::clone(catalog);
        registrations = registrations.handler(name, move |req| operation(&catalog, req));
        for prefix in CONNECTION_PREFIXES {
            registrations = registrations.route(Method::GET, &format!("{prefix}{suffix}"), name);
        }
    }
    registrations
}

struct ListTarget<'a> {
    connection_id: &'a str,
    db: i32,
    key: &'a str,
}

fn parse_param<T: FromStr>(name: &'static str, raw: &str) -> Result<T, HandlerFault> {
    raw.trim().parse().map_err(|_| HandlerFault::InvalidParameter {
        name,
        value: raw.to_string(),
    })
}

fn required<'a>(req: &'a HandlerRequest, name: &'static str) -> Result<&'a str, HandlerFault> {
    req.get_path_param(name)
        .ok_or(HandlerFault::InvalidParameter {
            name,
            value: String::new(),
        })
}

fn query_or<T: FromStr>(req: &HandlerRequest, name: &'static str, default: T) -> Result<T, HandlerFault> {
    match req.get_query_param(name) {
        Some(raw) => parse_param(name, raw),
        None => Ok(default),
    }
}

fn target(req: &HandlerRequest) -> Result<ListTarget<'_>, HandlerFault> {
    let db = match req.get_path_param("dbId") {
        Some(raw) => parse_param("dbId", raw)?,
        None => DEFAULT_DB,
    };
    Ok(ListTarget {
        connection_id: required(req, "connectionId")?,
        db,
        key: required(req, "key")?,
    })
}

fn index_param(req: &HandlerRequest) -> Result<i64, HandlerFault> {
    parse_param("index", required(req, "index")?)
}

fn range_params(req: &HandlerRequest) -> Result<(i64, i64), HandlerFault> {
    Ok((query_or(req, "start", 0)?, query_or(req, "stop", -1)?))
}

/// Number of elements in the list (0 for a missing key).
pub fn list_length(catalog: &ConnectionCatalog, req: &HandlerRequest) -> HandlerResult {
    let t = target(req)?;
    let Some(store) = catalog.lease(t.connection_id) else {
        return Ok(ResultValue::Absent);
    };
    Ok(ResultValue::Scalar(store.length(t.db, t.key)?))
}

/// Element at `index` as raw bytes.
pub fn list_index(catalog: &ConnectionCatalog, req: &HandlerRequest) -> HandlerResult {
    let t = target(req)?;
    let index = index_param(req)?;
    let Some(store) = catalog.lease(t.connection_id) else {
        return Ok(ResultValue::Absent);
    };
    Ok(store.index(t.db, t.key, index)?.into())
}

/// Element at `index` decoded as UTF-8 text.
pub fn list_index_string(catalog: &ConnectionCatalog, req: &HandlerRequest) -> HandlerResult {
    let t = target(req)?;
    let index = index_param(req)?;
    let Some(store) = catalog.lease(t.connection_id) else {
        return Ok(ResultValue::Absent);
    };
    Ok(store
        .index(t.db, t.key, index)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .into())
}

/// Elements `start..=stop` as raw bytes.
pub fn list_range(catalog: &ConnectionCatalog, req: &HandlerRequest) -> HandlerResult {
    let t = target(req)?;
    let (start, stop) = range_params(req)?;
    let Some(store) = catalog.lease(t.connection_id) else {
        return Ok(ResultValue::Absent);
    };
    Ok(ResultValue::byte_sequence(store.range(t.db, t.key, start, stop)?))
}

/// Elements `start..=stop` decoded as UTF-8 text.
pub fn list_range_string(catalog: &ConnectionCatalog, req: &HandlerRequest) -> HandlerResult {
    let t = target(req)?;
    let (start, stop) = range_params(req)?;
    let Some(store) = catalog.lease(t.connection_id) else {
        return Ok(ResultValue::Absent);
    };
    let items = store.range(t.db, t.key, start, stop)?;
    Ok(ResultValue::Sequence(
        items
            .iter()
            .map(|bytes| Element::Text(String::from_utf8_lossy(bytes).into_owned()))
            .collect(),
    ))
}
