mod cors_routes;
mod support;
