// Hosts one Collection Manager per collection on the server and exposes
// each screen action as an HTTP call.

pub mod handlers;
pub mod sessions;
