// handlers/mod.rs - HTTP handlers grouped by route prefix

pub mod auth; // POST /api/auth/register, POST /api/auth/login
pub mod data; // /api/data/{select,insert,update,delete}
pub mod keep_alive; // POST /api/keep_alive, GET /api/next-keep-alive
pub mod scores; // GET /api/scores/top
pub mod system; // GET /, GET /health
