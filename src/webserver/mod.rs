/// HTTP + WebSocket fixture server
///
/// - `routes`: REST, payload and fault routes plus the control surface
/// - `raw`: faults written directly to the TCP socket
/// - `listener`: accept loop that routes each connection to `raw` or hyper
/// - `middleware`: one request per connection
/// - `ws`: connection hub and correlation layer
/// - `server`: `FixtureServer` start/stop
mod listener;
mod middleware;
mod server;

pub mod models;
pub mod raw;
pub mod routes;
pub mod state;
pub mod ws;

pub use server::FixtureServer;
