//! Default value functions for configuration fields.
//!
//! One function per default so `#[serde(default = "...")]` can reference it
//! directly; keeps `Default` impls and serde defaults from drifting apart.

pub fn default_port() -> u16 {
    8080
}

pub fn default_admin_port() -> u16 {
    8081
}

pub fn default_mode() -> String {
    "dev".to_string()
}

pub fn default_read_timeout_secs() -> u64 {
    60
}

pub fn default_write_timeout_secs() -> u64 {
    10
}

pub fn default_machine_id() -> String {
    "default".to_string()
}

pub fn default_service_discovery_enabled() -> bool {
    true
}

pub fn default_service_discovery_type() -> String {
    "in-memory".to_string()
}

pub fn default_health_check_interval_secs() -> u64 {
    10
}

pub fn default_health_check_timeout_secs() -> u64 {
    5
}

pub fn default_deregister_after_secs() -> u64 {
    60
}

pub fn default_instance_ttl_secs() -> u64 {
    30
}

pub fn default_heartbeat_interval_secs() -> u64 {
    10
}

pub fn default_health_check_address() -> String {
    "0.0.0.0".to_string()
}

pub fn default_bus_enabled() -> bool {
    true
}

pub fn default_bus_brokers() -> Vec<String> {
    Vec::new()
}

pub fn default_topic_prefix() -> String {
    "game-fabric".to_string()
}

pub fn default_consumer_group() -> String {
    "game-fabric-hub".to_string()
}

pub fn default_producer_acks() -> String {
    "all".to_string()
}

pub fn default_producer_retries() -> u32 {
    3
}

pub fn default_batch_size() -> usize {
    16384
}

pub fn default_linger_ms() -> u64 {
    5
}

pub fn default_compression_type() -> String {
    "none".to_string()
}

pub fn default_consumer_auto_commit() -> bool {
    true
}

pub fn default_consumer_max_poll_records() -> usize {
    500
}

pub fn default_fetch_min_bytes() -> usize {
    1
}

pub fn default_fetch_max_wait_ms() -> u64 {
    500
}

pub fn default_bus_channel_capacity() -> usize {
    1024
}

pub fn default_cache_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_cache_port() -> u16 {
    6379
}

pub fn default_cache_db() -> u32 {
    0
}

pub fn default_cache_pool_size() -> u32 {
    10
}

pub fn default_jwt_expiration_secs() -> u64 {
    3600
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "text".to_string()
}

pub fn default_log_file_path() -> Option<String> {
    None
}

pub fn default_register_workers() -> usize {
    4
}

pub fn default_register_queue_capacity() -> usize {
    1024
}

pub fn default_broadcast_workers() -> usize {
    4
}

pub fn default_parallel_delivery_threshold() -> usize {
    100
}

pub fn default_parallel_delivery_semaphore() -> usize {
    50
}

pub fn default_lock_ttl_seconds() -> u64 {
    10
}

pub fn default_notify_timeout_seconds() -> u64 {
    5
}

pub fn default_worker_pool_workers() -> usize {
    8
}

pub fn default_worker_pool_queue_capacity() -> usize {
    512
}

pub fn default_worker_pool_task_timeout_secs() -> u64 {
    30
}

pub fn default_room_creations_per_minute() -> usize {
    5
}

pub fn default_join_attempts_per_minute() -> usize {
    20
}

pub fn default_connections_per_ip_per_minute() -> usize {
    30
}

pub fn default_grace_window_secs() -> u64 {
    30
}

pub fn default_event_buffer_size() -> usize {
    50
}
