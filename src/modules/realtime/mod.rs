/// Realtime delivery
///
/// - `hub`: the pub/sub actor every event goes through
/// - `session` / `handler`: the raw JSON channel on `/ws`
/// - `subscription`: hub-backed streams for GraphQL subscriptions
/// - `presence`: Redis-backed online state
pub mod events;
pub mod handler;
pub mod hub;
pub mod message;
pub mod presence;
pub mod session;
pub mod subscription;
