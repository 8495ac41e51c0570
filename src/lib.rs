// Configuration and error taxonomy
pub mod config;
pub mod error;

// Outbound HTTP
pub mod http;

// Bearer credential persistence
pub mod credentials;

// Authorization-Code exchange
pub mod oauth;

// Extract, transform, load
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod transform;

// Authorization redirect endpoint
pub mod api;
