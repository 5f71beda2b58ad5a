//! Follow edges between users.

use serde::Serialize;
use tracing::{debug, instrument};

use super::ServiceError;
use crate::storage::NoteshareDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowCounts {
    pub followers: i64,
    pub following: i64,
}

#[derive(Clone)]
pub struct SocialService {
    db: NoteshareDatabase,
}

impl SocialService {
    pub fn new(db: NoteshareDatabase) -> Self {
        Self { db }
    }

    /// Follow `followee_id`. Following twice is a no-op.
    #[instrument(skip(self), fields(op = "follow"))]
    pub async fn follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowCounts, ServiceError> {
        self.check_pair(follower_id, followee_id).await?;
        let created = self.db.follow(follower_id, followee_id).await?;
        debug!(created, "Follow recorded");
        self.follow_counts(followee_id).await
    }

    #[instrument(skip(self), fields(op = "unfollow"))]
    pub async fn unfollow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowCounts, ServiceError> {
        self.check_pair(follower_id, followee_id).await?;
        let removed = self.db.unfollow(follower_id, followee_id).await?;
        debug!(removed, "Follow removed");
        self.follow_counts(followee_id).await
    }

    pub async fn follow_counts(&self, user_id: &str) -> Result<FollowCounts, ServiceError> {
        let (followers, following) = self.db.follow_counts(user_id).await?;
        Ok(FollowCounts {
            followers,
            following,
        })
    }

    async fn check_pair(&self, follower_id: &str, followee_id: &str) -> Result<(), ServiceError> {
        if follower_id == followee_id {
            return Err(ServiceError::invalid_input("You cannot follow yourself"));
        }
        self.db.get_user(follower_id).await?;
        self.db.get_user(followee_id).await?;
        Ok(())
    }
}
