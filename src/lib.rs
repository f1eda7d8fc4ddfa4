//! # Resplit
//!
//! A RESP command splitter for sharded Redis pools.
//!
//! Resplit sits between a client-facing RESP decoder and a pool of
//! upstream Redis servers. Each decoded client command is classified,
//! forwarded to the shard that owns its key — or fanned out one
//! sub-request per key for multi-key reads — and the upstream replies are
//! folded back into the single RESP value the client expects, in client
//! key order. Outstanding upstream handles are released on every exit
//! path, including client disconnect mid-flight.
//!
//! The crate owns no sockets: the sharded connection pool, the wire-level
//! codec, and the event loop all belong to the embedder and are reached
//! through the traits in [`pool`] and [`splitter`].

pub mod catalog;
pub mod error;
pub mod pool;
pub mod resp;
pub mod splitter;
pub mod stats;
