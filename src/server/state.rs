use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::engagement::EngagementManager;
use crate::feed::FeedAssembler;
use crate::notifications::{NotificationDispatcher, NotificationService};

use super::websocket::{BrokerSlot, ConnectionManager};
use super::ServerConfig;

pub type GuardedEngagementManager = Arc<EngagementManager>;
pub type GuardedFeedAssembler = Arc<FeedAssembler>;
pub type GuardedNotificationService = Arc<NotificationService>;
pub type GuardedConnectionManager = Arc<ConnectionManager>;
pub type GuardedBrokerSlot = Arc<BrokerSlot>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engagement_manager: GuardedEngagementManager,
    pub feed_assembler: GuardedFeedAssembler,
    pub notification_service: GuardedNotificationService,
    pub ws_connection_manager: GuardedConnectionManager,
    pub realtime: GuardedBrokerSlot,
    pub notification_dispatcher: NotificationDispatcher,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedEngagementManager {
    fn from_ref(input: &ServerState) -> Self {
        input.engagement_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedFeedAssembler {
    fn from_ref(input: &ServerState) -> Self {
        input.feed_assembler.clone()
    }
}

impl FromRef<ServerState> for GuardedNotificationService {
    fn from_ref(input: &ServerState) -> Self {
        input.notification_service.clone()
    }
}

impl FromRef<ServerState> for GuardedConnectionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.ws_connection_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedBrokerSlot {
    fn from_ref(input: &ServerState) -> Self {
        input.realtime.clone()
    }
}
