//! The catalog of Redis commands the splitter accepts.
//!
//! Commands are grouped by how they route: single-key commands go to the
//! shard owning the key in position 1, the eval commands hash on the first
//! declared key in position 3, and `mget` fans out one sub-request per
//! key. Anything not listed here is rejected as unsupported.

/// Commands forwarded verbatim to the shard owning the key in position 1.
pub fn simple_commands() -> &'static [&'static str] {
    &[
        "append",
        "bitcount",
        "bitfield",
        "bitpos",
        "decr",
        "decrby",
        "dump",
        "expire",
        "expireat",
        "geoadd",
        "geodist",
        "geohash",
        "geopos",
        "get",
        "getbit",
        "getrange",
        "getset",
        "hdel",
        "hexists",
        "hget",
        "hgetall",
        "hincrby",
        "hincrbyfloat",
        "hkeys",
        "hlen",
        "hmget",
        "hmset",
        "hscan",
        "hset",
        "hsetnx",
        "hstrlen",
        "hvals",
        "incr",
        "incrby",
        "incrbyfloat",
        "lindex",
        "linsert",
        "llen",
        "lpop",
        "lpush",
        "lpushx",
        "lrange",
        "lrem",
        "lset",
        "ltrim",
        "persist",
        "pexpire",
        "pexpireat",
        "psetex",
        "pttl",
        "restore",
        "rpop",
        "rpush",
        "rpushx",
        "sadd",
        "scard",
        "set",
        "setbit",
        "setex",
        "setnx",
        "setrange",
        "sismember",
        "smembers",
        "spop",
        "srandmember",
        "srem",
        "sscan",
        "strlen",
        "ttl",
        "type",
        "zadd",
        "zcard",
        "zcount",
        "zincrby",
        "zlexcount",
        "zrange",
        "zrangebylex",
        "zrangebyscore",
        "zrank",
        "zrem",
        "zremrangebylex",
        "zremrangebyrank",
        "zremrangebyscore",
        "zrevrange",
        "zrevrangebylex",
        "zrevrangebyscore",
        "zrevrank",
        "zscan",
        "zscore",
    ]
}

/// Scripting commands, routed by the first declared key (position 3).
pub fn eval_commands() -> &'static [&'static str] {
    &["eval", "evalsha"]
}

/// The one multi-key read served by fan-out.
pub fn mget() -> &'static str {
    "mget"
}
