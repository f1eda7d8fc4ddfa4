//! Interface to the sharded upstream connection pool.
//!
//! The pool owns the sockets and the hash ring; the splitter only hands it
//! a routing key, a request to forward, and a callback sink, and gets back
//! a cancellable handle. All callbacks for a given request fire on the
//! thread that made it, strictly after `make_request` returns.

use std::rc::Rc;

use crate::resp::RespValue;

/// One in-flight upstream request.
///
/// A handle is live from creation until a callback is delivered for it or
/// `cancel` is called, whichever comes first.
pub trait RequestHandle {
    /// Abort the request. After this returns, neither pool callback fires.
    fn cancel(&self);
}

/// Receiver side of a single upstream request.
///
/// At most one of the two methods is invoked per handle.
pub trait PoolCallbacks {
    /// The upstream answered.
    fn on_response(&self, response: RespValue);

    /// The upstream connection failed before an answer arrived.
    fn on_failure(&self);
}

/// A sharded pool of upstream Redis connections.
pub trait ConnectionPool {
    /// Enqueue `request` on the shard owning `hash_key`.
    ///
    /// Returns `None` when no upstream host is selectable for the key; the
    /// callbacks are never invoked in that case.
    fn make_request(
        &self,
        hash_key: &[u8],
        request: &RespValue,
        callbacks: Rc<dyn PoolCallbacks>,
    ) -> Option<Box<dyn RequestHandle>>;

    /// Name of the host `hash_key` routes to. Debug and logging only.
    fn get_host(&self, hash_key: &[u8]) -> Option<String>;
}
