//! Command splitting over a sharded connection pool.
//!
//! [`CommandSplitter`] takes each decoded client command, decides how it
//! can be served by the sharded cluster, dispatches one or more
//! sub-requests through the connection pool, and delivers exactly one
//! aggregated reply through the caller's callback sink. Single-key
//! commands are forwarded verbatim to the shard owning their key;
//! `MGET` fans out one sub-request per key and reassembles the replies in
//! client key order regardless of which shard answered first.
//!
//! Everything here runs on one thread: the pool promises that callbacks
//! for a request fire on the thread that made it, strictly after
//! `make_request` returns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::catalog;
use crate::error::SplitError;
use crate::pool::{ConnectionPool, PoolCallbacks, RequestHandle};
use crate::resp::RespValue;
use crate::stats::{Counter, StatsRegistry};

/// Reply sink supplied by the caller of [`CommandSplitter::make_request`].
///
/// Exactly one `on_response` is delivered per accepted command. The caller
/// guarantees the sink outlives the returned request unless it cancels.
pub trait SplitCallbacks {
    fn on_response(&self, response: RespValue);
}

/// An in-flight split request, as returned to the caller.
pub trait SplitRequest {
    /// Release every outstanding upstream handle and suppress the reply.
    /// Must not be called after the reply has been delivered.
    fn cancel(&self);
}

/// Handler categories. The set is closed, so dispatch is a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerKind {
    Simple,
    Eval,
    Mget,
}

struct HandlerEntry {
    kind: HandlerKind,
    total: Counter,
}

struct SplitterStats {
    invalid_request: Counter,
    unsupported_command: Counter,
}

/// The dispatcher: validates each decoded command, looks up its handler,
/// tallies statistics, and starts the request. Retains no request state;
/// every started request owns itself.
pub struct CommandSplitter {
    pool: Rc<dyn ConnectionPool>,
    command_map: HashMap<String, HandlerEntry>,
    stats: SplitterStats,
}

impl CommandSplitter {
    /// Build a dispatcher bound to `pool`, registering its counters in
    /// `registry` under `stat_prefix` (e.g. `"redis."`).
    pub fn new(
        pool: Rc<dyn ConnectionPool>,
        registry: &StatsRegistry,
        stat_prefix: &str,
    ) -> Self {
        let stats = SplitterStats {
            invalid_request: registry
                .counter(&format!("{stat_prefix}splitter.invalid_request")),
            unsupported_command: registry
                .counter(&format!("{stat_prefix}splitter.unsupported_command")),
        };

        let mut command_map = HashMap::new();
        for command in catalog::simple_commands() {
            add_handler(
                &mut command_map,
                registry,
                stat_prefix,
                command,
                HandlerKind::Simple,
            );
        }
        for command in catalog::eval_commands() {
            add_handler(
                &mut command_map,
                registry,
                stat_prefix,
                command,
                HandlerKind::Eval,
            );
        }
        add_handler(
            &mut command_map,
            registry,
            stat_prefix,
            catalog::mget(),
            HandlerKind::Mget,
        );

        CommandSplitter {
            pool,
            command_map,
            stats,
        }
    }

    /// Split one decoded client command.
    ///
    /// Returns the in-flight request while upstream replies are
    /// outstanding, or `None` when the reply has already been delivered
    /// through `callbacks` — a validation failure, an unsupported command,
    /// or every sub-request resolving synchronously.
    pub fn make_request(
        &self,
        request: RespValue,
        callbacks: Rc<dyn SplitCallbacks>,
    ) -> Option<Rc<dyn SplitRequest>> {
        let items = match request.as_array() {
            Some(items)
                if items.len() >= 2
                    && items
                        .iter()
                        .all(|item| matches!(item, RespValue::BulkString(_))) =>
            {
                items
            }
            _ => {
                self.on_invalid_request(&*callbacks);
                return None;
            }
        };

        let name = String::from_utf8_lossy(items[0].as_str().unwrap_or_default()).into_owned();
        let lowered = name.to_ascii_lowercase();

        let Some(entry) = self.command_map.get(&lowered) else {
            self.stats.unsupported_command.inc();
            callbacks.on_response(SplitError::UnsupportedCommand(name).to_resp());
            return None;
        };

        debug!("splitting '{request}'");
        entry.total.inc();
        match entry.kind {
            HandlerKind::Simple => SingleShardRequest::simple(&*self.pool, &request, callbacks),
            HandlerKind::Eval => SingleShardRequest::eval(&*self.pool, &request, callbacks),
            HandlerKind::Mget => MgetRequest::create(&*self.pool, &request, callbacks),
        }
    }

    fn on_invalid_request(&self, callbacks: &dyn SplitCallbacks) {
        self.stats.invalid_request.inc();
        callbacks.on_response(SplitError::InvalidRequest.to_resp());
    }
}

fn add_handler(
    command_map: &mut HashMap<String, HandlerEntry>,
    registry: &StatsRegistry,
    stat_prefix: &str,
    name: &str,
    kind: HandlerKind,
) {
    let name = name.to_ascii_lowercase();
    let total = registry.counter(&format!("{stat_prefix}command.{name}.total"));
    command_map.insert(name, HandlerEntry { kind, total });
}

fn on_wrong_number_of_arguments(callbacks: &dyn SplitCallbacks, request: &RespValue) {
    let name = request
        .as_array()
        .and_then(|items| items.first())
        .and_then(RespValue::to_string_lossy)
        .unwrap_or_default();
    callbacks.on_response(SplitError::WrongNumberOfArguments(name).to_resp());
}

/// A request forwarded verbatim to the single shard owning its key.
///
/// Covers the plain single-key commands (key in position 1) and the eval
/// commands (first declared key in position 3). The upstream reply passes
/// through untouched; an upstream failure becomes the reply.
struct SingleShardRequest {
    callbacks: Rc<dyn SplitCallbacks>,
    handle: RefCell<Option<Box<dyn RequestHandle>>>,
}

impl SingleShardRequest {
    fn simple(
        pool: &dyn ConnectionPool,
        request: &RespValue,
        callbacks: Rc<dyn SplitCallbacks>,
    ) -> Option<Rc<dyn SplitRequest>> {
        Self::route(pool, request, callbacks, 1)
    }

    /// EVAL looks like: EVAL script numkeys key [key ...] arg [arg ...].
    /// At least four elements are required or the command cannot be hashed.
    fn eval(
        pool: &dyn ConnectionPool,
        request: &RespValue,
        callbacks: Rc<dyn SplitCallbacks>,
    ) -> Option<Rc<dyn SplitRequest>> {
        if request.as_array().map_or(0, |items| items.len()) < 4 {
            on_wrong_number_of_arguments(&*callbacks, request);
            return None;
        }
        Self::route(pool, request, callbacks, 3)
    }

    fn route(
        pool: &dyn ConnectionPool,
        request: &RespValue,
        callbacks: Rc<dyn SplitCallbacks>,
        key_index: usize,
    ) -> Option<Rc<dyn SplitRequest>> {
        let request_ref = Rc::new(SingleShardRequest {
            callbacks,
            handle: RefCell::new(None),
        });

        let handle = request
            .as_array()
            .and_then(|items| items.get(key_index))
            .and_then(RespValue::as_str)
            .and_then(|key| pool.make_request(key, request, request_ref.clone()));

        match handle {
            Some(handle) => {
                *request_ref.handle.borrow_mut() = Some(handle);
                Some(request_ref)
            }
            None => {
                request_ref
                    .callbacks
                    .on_response(SplitError::NoUpstreamHost.to_resp());
                None
            }
        }
    }
}

impl PoolCallbacks for SingleShardRequest {
    fn on_response(&self, response: RespValue) {
        self.handle.borrow_mut().take();
        self.callbacks.on_response(response);
    }

    fn on_failure(&self) {
        self.handle.borrow_mut().take();
        self.callbacks
            .on_response(SplitError::UpstreamFailure.to_resp());
    }
}

impl SplitRequest for SingleShardRequest {
    fn cancel(&self) {
        if let Some(handle) = self.handle.borrow_mut().take() {
            handle.cancel();
        }
    }
}

impl Drop for SingleShardRequest {
    fn drop(&mut self) {
        debug_assert!(self.handle.borrow().is_none());
    }
}

/// `MGET k1 … kN`, fanned out as one single-key sub-request per key.
///
/// The reply is always an `Array` of length N; slot `i` holds the outcome
/// for input key `i` no matter which shard answered or in which order.
/// Per-slot failures stay per-slot: the aggregate never collapses into a
/// single error.
struct MgetRequest {
    callbacks: Rc<dyn SplitCallbacks>,
    children: RefCell<Vec<Rc<PendingChild>>>,
    state: RefCell<AggregationState>,
}

struct AggregationState {
    /// Length fixed at construction, one slot per input key.
    pending_response: Vec<RespValue>,
    num_pending: usize,
    error_count: usize,
}

/// Per-child bookkeeping for a fragmented request.
///
/// The parent owns the child vector; children hold a non-owning
/// back-reference used only on the callback path, so no cycle exists.
struct PendingChild {
    parent: Weak<MgetRequest>,
    /// Slot in the parent's aggregation array.
    index: usize,
    /// Slots a batched array reply maps onto, element by element. One
    /// entry in the current one-key-per-child form.
    response_indexes: Vec<usize>,
    handle: RefCell<Option<Box<dyn RequestHandle>>>,
}

impl PoolCallbacks for PendingChild {
    fn on_response(&self, response: RespValue) {
        self.handle.borrow_mut().take();
        if let Some(parent) = self.parent.upgrade() {
            parent.on_child_response(response, self.index, &self.response_indexes);
        }
    }

    fn on_failure(&self) {
        self.on_response(SplitError::UpstreamFailure.to_resp());
    }
}

impl MgetRequest {
    fn create(
        pool: &dyn ConnectionPool,
        request: &RespValue,
        callbacks: Rc<dyn SplitCallbacks>,
    ) -> Option<Rc<dyn SplitRequest>> {
        let keys: Vec<Vec<u8>> = match request.as_array() {
            Some(items) => items[1..]
                .iter()
                .filter_map(|item| item.as_str().map(<[u8]>::to_vec))
                .collect(),
            None => Vec::new(),
        };

        let num_keys = keys.len();
        let request_ref = Rc::new(MgetRequest {
            callbacks,
            children: RefCell::new(Vec::with_capacity(num_keys)),
            state: RefCell::new(AggregationState {
                pending_response: vec![RespValue::Null; num_keys],
                num_pending: num_keys,
                error_count: 0,
            }),
        });

        for (i, key) in keys.into_iter().enumerate() {
            let child = Rc::new(PendingChild {
                parent: Rc::downgrade(&request_ref),
                index: i,
                response_indexes: vec![i],
                handle: RefCell::new(None),
            });
            request_ref.children.borrow_mut().push(child.clone());

            // Single-key MGET form, so the upstream answers with the same
            // bulk-string-or-null shape the slot expects.
            let sub_request = RespValue::array(vec![
                RespValue::bulk_string("MGET"),
                RespValue::bulk_string(key.clone()),
            ]);
            debug!("parallel get: '{sub_request}'");

            match pool.make_request(&key, &sub_request, child.clone()) {
                Some(handle) => *child.handle.borrow_mut() = Some(handle),
                None => child.on_response(SplitError::NoUpstreamHost.to_resp()),
            }
        }

        if request_ref.state.borrow().num_pending > 0 {
            Some(request_ref)
        } else {
            None
        }
    }

    fn on_child_response(&self, value: RespValue, index: usize, response_indexes: &[usize]) {
        let finished = {
            let mut state = self.state.borrow_mut();
            match value {
                RespValue::Integer(_) | RespValue::SimpleString(_) => {
                    state.pending_response[index] = SplitError::UpstreamProtocolError.to_resp();
                    state.error_count += 1;
                }
                RespValue::Error(_) | RespValue::BulkString(_) => {
                    state.error_count += 1;
                    state.pending_response[index] = value;
                }
                RespValue::Array(mut elements) => {
                    for j in 0..response_indexes.len() {
                        if let Some(element) = elements.get_mut(j) {
                            state.pending_response[index] =
                                std::mem::replace(element, RespValue::Null);
                        }
                    }
                }
                RespValue::Null => {}
            }

            debug_assert!(state.num_pending > 0);
            state.num_pending -= 1;
            state.num_pending == 0
        };

        if finished {
            let (response, error_count) = {
                let mut state = self.state.borrow_mut();
                (
                    RespValue::array(std::mem::take(&mut state.pending_response)),
                    state.error_count,
                )
            };
            debug!("response: '{response}' ({error_count} slots flagged)");
            self.callbacks.on_response(response);
        }
    }
}

impl SplitRequest for MgetRequest {
    fn cancel(&self) {
        for child in self.children.borrow().iter() {
            if let Some(handle) = child.handle.borrow_mut().take() {
                handle.cancel();
            }
        }
    }
}

impl Drop for MgetRequest {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        for child in self.children.borrow().iter() {
            debug_assert!(child.handle.borrow().is_none());
        }
    }
}
