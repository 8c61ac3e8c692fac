//! Route match precedence: a literal segment always beats a parameterised
//! one at the same position, and captured params surface on the request.

use std::sync::Arc;

use http::Method;
use sockeon::{
    http_proto::{Request, Response},
    route::RouteTable,
};

fn ok() -> Arc<dyn Fn(&Request) -> sockeon::Result<Response> + Send + Sync> {
    Arc::new(|_: &Request| Ok(Response::text("ok")))
}

#[test]
fn literal_route_wins_and_parameterised_route_captures_its_param() {
    let mut table = RouteTable::new();
    table.register(Method::GET, "/users/{id}", ok());
    table.register(Method::GET, "/users/all", ok());

    let (_, params) = table.matches(&Method::GET, "/users/all").unwrap();
    assert!(params.is_empty(), "the literal route should have won, not the parameterised one");

    let (_, params) = table.matches(&Method::GET, "/users/123").unwrap();
    assert_eq!(params.get("id").map(String::as_str), Some("123"));
}

#[test]
fn a_genuine_specificity_tie_is_broken_in_favor_of_the_first_registered_route() {
    let mut table = RouteTable::new();
    table.register(Method::GET, "/posts/{slug}", ok());
    table.register(Method::GET, "/posts/{id}", ok());

    let (_, params) = table.matches(&Method::GET, "/posts/hello-world").unwrap();
    assert_eq!(params.get("slug").map(String::as_str), Some("hello-world"));
    assert!(!params.contains_key("id"));
}
