//! Static route table mapping URL paths to named views.
//!
//! Routes are declared once at startup and matched in declaration order. A
//! pattern segment starting with `:` binds the corresponding URL segment
//! verbatim; nothing is decoded, coerced or validated here. Views that consume
//! the parameters own that responsibility.

use crate::domain::money::Amount;
use crate::domain::ports::RouteParams;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const LOGIN: &str = "login";
pub const SIGNUP: &str = "signup";
pub const MEMBER: &str = "member";
pub const PROJECT: &str = "project";
pub const PROJECT_THANK_YOU: &str = "project.thank-you";

/// Query parameter that pre-fills the donation form.
pub const AMOUNT_QUERY_PARAM: &str = "amount";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unknown route: {0}")]
    UnknownRoute(String),
    #[error("Missing parameter '{param}' for route {route}")]
    MissingParam { route: String, param: String },
    #[error("Route {0} is declared more than once")]
    DuplicateRoute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Dynamic(String),
}

fn parse_pattern(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Dynamic(name.to_string()),
            None => Segment::Static(s.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: String,
    segments: Vec<Segment>,
}

impl Route {
    /// Full dotted name, e.g. `project.thank-you`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path pattern with `:param` placeholders.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn bind(&self, segments: &[&str]) -> Option<RouteParams> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (expected, actual) in self.segments.iter().zip(segments) {
            match expected {
                Segment::Static(s) if s == actual => {}
                Segment::Static(_) => return None,
                Segment::Dynamic(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }
}

/// Result of recognizing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub name: String,
    pub params: RouteParams,
    pub query: BTreeMap<String, String>,
}

impl RouteMatch {
    /// Value bound to the path parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Raw value of the first `name` query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The donation amount carried in the query string, if it parses.
    pub fn prefilled_amount(&self) -> Option<Amount> {
        self.query_param(AMOUNT_QUERY_PARAM)?.parse().ok()
    }
}

#[derive(Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
}

impl RouteTableBuilder {
    /// Declares a route whose path is its own name, e.g. `login` at `/login`.
    pub fn route(self, name: &str) -> Self {
        let path = format!("/{}", name);
        self.route_with_path(name, &path)
    }

    /// Declares a route at an explicit path pattern.
    pub fn route_with_path(mut self, name: &str, path: &str) -> Self {
        self.routes.push(Route {
            name: name.to_string(),
            pattern: path.to_string(),
            segments: parse_pattern(path),
        });
        self
    }

    /// Declares `parent.name` at the parent's path followed by `path`.
    pub fn child(self, parent: &str, name: &str, path: &str) -> Self {
        let parent_pattern = self
            .routes
            .iter()
            .find(|r| r.name == parent)
            .map(|r| r.pattern.clone())
            .unwrap_or_else(|| format!("/{}", parent));
        let full_name = format!("{}.{}", parent, name);
        let full_path = format!(
            "{}/{}",
            parent_pattern.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        self.route_with_path(&full_name, &full_path)
    }

    /// Finishes the table.
    ///
    /// # Errors
    ///
    /// Returns `RouteError::DuplicateRoute` if a name was declared twice.
    pub fn build(self) -> Result<RouteTable, RouteError> {
        for (i, route) in self.routes.iter().enumerate() {
            if self.routes[..i].iter().any(|r| r.name == route.name) {
                return Err(RouteError::DuplicateRoute(route.name.clone()));
            }
        }
        Ok(RouteTable {
            routes: self.routes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Starts an empty table.
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The application's route map.
    pub fn standard() -> Self {
        Self {
            routes: Self::builder()
                .route(LOGIN)
                .route(SIGNUP)
                .route_with_path(MEMBER, "/:memberSlug")
                .route_with_path(PROJECT, "/:memberSlug/:projectSlug")
                .child(PROJECT, "thank-you", "/thank-you")
                .routes,
        }
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Finds the first declared route matching `url`.
    ///
    /// The query string is split off and kept as raw key/value pairs; empty
    /// path segments (leading, trailing or doubled slashes) are ignored.
    pub fn recognize(&self, url: &str) -> Option<RouteMatch> {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.routes.iter().find_map(|route| {
            route.bind(&segments).map(|params| RouteMatch {
                name: route.name.clone(),
                params,
                query: parse_query(query),
            })
        })
    }

    /// Builds the URL for a named route.
    ///
    /// Parameters the route does not use are ignored.
    ///
    /// # Errors
    ///
    /// * `RouteError::UnknownRoute` - no route is named `name`.
    /// * `RouteError::MissingParam` - a `:param` in the pattern has no value.
    pub fn url_for(&self, name: &str, params: &RouteParams) -> Result<String, RouteError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RouteError::UnknownRoute(name.to_string()))?;

        let mut url = String::new();
        for segment in &route.segments {
            url.push('/');
            match segment {
                Segment::Static(s) => url.push_str(s),
                Segment::Dynamic(param) => {
                    let value = params.get(param).ok_or_else(|| RouteError::MissingParam {
                        route: name.to_string(),
                        param: param.clone(),
                    })?;
                    url.push_str(value);
                }
            }
        }

        if url.is_empty() {
            url.push('/');
        }
        Ok(url)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_string(), v.to_string())
        })
        .filter(|(k, _)| !k.is_empty())
        .collect()
}
