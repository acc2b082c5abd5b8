//! Lua decision scripts
//!
//! One script per algorithm, each executed server-side as a single atomic
//! unit so that check-and-increment never races across concurrent callers.
//! All three return the uniform reply `{success, limit, remaining, reset,
//! retry_after}`, extended with `{pending, throughput}` when the analytics
//! flag (last ARGV) is set.
//!
//! Key layout:
//! - `KEYS[1]` - the entry key
//! - `KEYS[2]` - the analytics key, present only when analytics is enabled
//!
//! Keys expire at twice their interval, which bounds memory without a
//! separate reaper.

use redis::Script;
use std::sync::OnceLock;

/// Evict entries at or beyond the window edge, count, insert on admission.
/// ARGV: now_ms, interval_ms, limit, member, analytics
const SLIDING_WINDOW_SRC: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local interval = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]
local analytics = tonumber(ARGV[5])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - interval)
local count = redis.call('ZCARD', key)

local success = 0
if count < limit then
  success = 1
  redis.call('ZADD', key, now, member)
  count = count + 1
end
redis.call('PEXPIRE', key, interval * 2)

local remaining = limit - count
if remaining < 0 then
  remaining = 0
end

local reset = now + interval
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if oldest[2] then
  reset = tonumber(oldest[2]) + interval
end

local retry_after = 0
if success == 0 then
  retry_after = math.ceil((reset - now) / 1000)
  if retry_after < 1 then
    retry_after = 1
  end
end

if analytics == 1 then
  local analytics_key = KEYS[2]
  redis.call('ZADD', analytics_key, now, member)
  redis.call('PEXPIRE', analytics_key, interval * 2)
  local throughput = redis.call('ZCOUNT', analytics_key, now - 1000, '+inf')
  return {success, limit, remaining, reset, retry_after, count, throughput}
end

return {success, limit, remaining, reset, retry_after}
"#;

/// Increment the epoch-partitioned counter; TTL is set on the first hit.
/// Blocked calls still increment. ARGV: now_ms, interval_ms, limit, member,
/// analytics
const FIXED_WINDOW_SRC: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local interval = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local member = ARGV[4]
local analytics = tonumber(ARGV[5])

local count = redis.call('INCR', key)
if count == 1 then
  redis.call('PEXPIRE', key, interval * 2)
end

local success = 0
if count <= limit then
  success = 1
end

local remaining = limit - count
if remaining < 0 then
  remaining = 0
end

local reset = (math.floor(now / interval) + 1) * interval

local retry_after = 0
if success == 0 then
  local ttl = redis.call('PTTL', key)
  if ttl < 0 then
    ttl = 0
  end
  retry_after = math.ceil(ttl / 1000)
  if retry_after < 1 then
    retry_after = 1
  end
end

if analytics == 1 then
  local analytics_key = KEYS[2]
  redis.call('ZADD', analytics_key, now, member)
  redis.call('PEXPIRE', analytics_key, interval * 2)
  local throughput = redis.call('ZCOUNT', analytics_key, now - 1000, '+inf')
  return {success, limit, remaining, reset, retry_after, count, throughput}
end

return {success, limit, remaining, reset, retry_after}
"#;

/// Refill from elapsed time, then consume one token on admission.
/// ARGV: now_ms, interval_ms, limit, refill_rate, member, analytics
const TOKEN_BUCKET_SRC: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local interval = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local refill_rate = tonumber(ARGV[4])
local member = ARGV[5]
local analytics = tonumber(ARGV[6])

local bucket = redis.call('HMGET', key, 'tokens', 'lastRefill')
local tokens = tonumber(bucket[1])
local last_refill = tonumber(bucket[2])
if tokens == nil or last_refill == nil then
  tokens = limit
  last_refill = now
end

local elapsed = now - last_refill
local refill = math.floor(elapsed * refill_rate / interval)
if refill > 0 then
  tokens = math.min(limit, tokens + refill)
  last_refill = now
end

local success = 0
if tokens >= 1 then
  success = 1
  tokens = tokens - 1
end

redis.call('HSET', key, 'tokens', tokens, 'lastRefill', last_refill)
redis.call('PEXPIRE', key, interval * 2)

local reset = last_refill + interval

local retry_after = 0
if success == 0 then
  retry_after = math.ceil((1 - tokens) * interval / refill_rate / 1000)
  if retry_after < 1 then
    retry_after = 1
  end
end

if analytics == 1 then
  local analytics_key = KEYS[2]
  redis.call('ZADD', analytics_key, now, member)
  redis.call('PEXPIRE', analytics_key, interval * 2)
  local throughput = redis.call('ZCOUNT', analytics_key, now - 1000, '+inf')
  return {success, limit, tokens, reset, retry_after, limit - tokens, throughput}
end

return {success, limit, tokens, reset, retry_after}
"#;

static SLIDING_WINDOW: OnceLock<Script> = OnceLock::new();
static FIXED_WINDOW: OnceLock<Script> = OnceLock::new();
static TOKEN_BUCKET: OnceLock<Script> = OnceLock::new();

/// Sliding window decision script
pub(crate) fn sliding_window() -> &'static Script {
    SLIDING_WINDOW.get_or_init(|| Script::new(SLIDING_WINDOW_SRC))
}

/// Fixed window decision script
pub(crate) fn fixed_window() -> &'static Script {
    FIXED_WINDOW.get_or_init(|| Script::new(FIXED_WINDOW_SRC))
}

/// Token bucket decision script
pub(crate) fn token_bucket() -> &'static Script {
    TOKEN_BUCKET.get_or_init(|| Script::new(TOKEN_BUCKET_SRC))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_parse_and_hash() {
        // Script::new computes the sha1 eagerly; distinct sources must yield
        // distinct hashes.
        let hashes = [
            sliding_window().get_hash().to_string(),
            fixed_window().get_hash().to_string(),
            token_bucket().get_hash().to_string(),
        ];
        assert_eq!(hashes[0].len(), 40);
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
    }
}
